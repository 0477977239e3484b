use anyhow::{anyhow, bail, Result};
use fracscript_lib::vm::{StepResult, VmState, VM};
use rustyline::{error::ReadlineError, DefaultEditor};

#[derive(Debug, PartialEq, Clone)]
enum UserCommand {
    Next,
    Continue,
    LastCommand,
    ShowStack,
    ShowFrames,
    ShowGlobals,
    ShowCode,
    ShowStackAt(usize),
    Quit,
}

pub fn run(vm: &mut VM) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut last_cmd: Option<UserCommand> = None;

    use UserCommand::*;
    loop {
        print_next_instructions(vm);
        let mut cmd = read_line(&mut rl)?;
        if cmd == LastCommand {
            match &last_cmd {
                Some(last) => cmd = last.clone(),
                // nothing to repeat
                None => continue,
            }
        }
        match &cmd {
            LastCommand => {}
            Next => {
                if let StepResult::Done(res) = step(vm)? {
                    println!("Program finished with {}", res);
                    return Ok(());
                }
            }
            Continue => loop {
                if let StepResult::Done(res) = step(vm)? {
                    println!("Program finished with {}", res);
                    return Ok(());
                }
            },
            ShowStack => {
                for (i, elem) in vm.stack().iter().enumerate().rev() {
                    println!("{}: {}", i, elem);
                }
            }
            ShowFrames => {
                for (i, frame) in vm.frames().iter().enumerate().rev() {
                    println!(
                        "{}: fn@{} returns to {}",
                        i, frame.function.entry, frame.return_address
                    );
                    for (id, val) in &frame.locals {
                        println!("    {}: {}", symbol_label(vm, *id), val);
                    }
                }
            }
            ShowGlobals => {
                let mut globals: Vec<_> = vm.globals().iter().collect();
                globals.sort_by_key(|(id, _)| **id);
                for (id, val) in globals {
                    println!("{}: {}", symbol_label(vm, *id), val);
                }
            }
            ShowCode => print!("{}", fracscript_lib::core::print_bytecode(vm.bytecode())),
            ShowStackAt(i) => match vm.stack().get(*i) {
                Some(val) => println!("{}", val),
                None => println!("Invalid stack index"),
            },
            Quit => return Ok(()),
        }
        last_cmd = Some(cmd);
    }
}

fn step(vm: &mut VM) -> Result<StepResult> {
    let ip = vm.ip();
    vm.step()
        .map_err(|e| anyhow!("Runtime error at {}: {}", ip, e))
}

fn symbol_label(vm: &VM, id: fracscript_lib::core::SymbolId) -> String {
    match vm.bytecode().symbol_name(id) {
        Some(name) => format!("{}{}", name, id),
        None => id.to_string(),
    }
}

fn print_next_instructions(vm: &VM) {
    if vm.state() != VmState::Running {
        return;
    }
    println!("Next instructions:");
    let bc = vm.bytecode();
    for line in (vm.ip()..).take(5).filter_map(|i| bc.render_instruction(i)) {
        println!("{}", line);
    }
}

fn read_line(rl: &mut DefaultEditor) -> Result<UserCommand> {
    loop {
        let line = rl.readline("> ");
        use ReadlineError::*;
        match line {
            Ok(line) => match parse_line(&line) {
                Ok(cmd) => {
                    if cmd != UserCommand::LastCommand {
                        let _ = rl.add_history_entry(line.as_str());
                    }
                    return Ok(cmd);
                }
                Err(e) => eprintln!("Error: {}", e),
            },
            Err(Interrupted | Eof) => return Ok(UserCommand::Quit),
            Err(other) => return Err(other.into()),
        }
    }
}

fn parse_line(line: &str) -> Result<UserCommand> {
    use UserCommand::*;
    let elems: Vec<_> = line.split_whitespace().collect();
    match elems.first() {
        None => Ok(LastCommand),
        Some(&("n" | "next")) => Ok(Next),
        Some(&("c" | "continue")) => Ok(Continue),
        Some(&("q" | "quit")) => Ok(Quit),
        Some(&("s" | "show")) => parse_show(&elems[1..]),
        Some(_) => Err(anyhow!("Invalid Command")),
    }
}

fn parse_show(elems: &[&str]) -> Result<UserCommand> {
    match elems {
        [] => bail!("show needs an argument"),
        ["s" | "stack"] => Ok(UserCommand::ShowStack),
        ["f" | "frames"] => Ok(UserCommand::ShowFrames),
        ["g" | "globals"] => Ok(UserCommand::ShowGlobals),
        ["c" | "code"] => Ok(UserCommand::ShowCode),
        ["s" | "stack", "at", idx] => Ok(UserCommand::ShowStackAt(idx.parse()?)),
        _ => bail!("Invalid word after show"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse() {
        assert_eq!(parse_line("n").unwrap(), UserCommand::Next);
        assert_eq!(parse_line("  ").unwrap(), UserCommand::LastCommand);
        assert_eq!(parse_line("s stack at 2").unwrap(), UserCommand::ShowStackAt(2));
        assert_eq!(parse_line("show globals").unwrap(), UserCommand::ShowGlobals);
        assert!(parse_line("s").is_err());
        assert!(parse_line("jump").is_err());
        assert!(parse_line("s stack at x").is_err());
    }
}

use anyhow::{anyhow, Context, Result};
use glob::glob;
use std::result::Result as StdResult;

use std::fs;
use std::path::Path;
use std::process::Command;

const INTERPRETER: &str = "../target/release/fracs";

fn main() -> Result<()> {
    compile_fracs().context("compiling interpreter")?;

    let scripts: Vec<_> = glob("tests/*.frac")?.collect::<StdResult<_, _>>()?;
    let mut failed = 0;
    for script in &scripts {
        let expected_path = script.with_extension("out");
        let expected_output = fs::read_to_string(&expected_path)
            .with_context(|| format!("loading expected output: {}", expected_path.display()))?;
        let output = run_script(script)?;
        if output == expected_output {
            println!("{}: passed", script.display());
        } else {
            failed += 1;
            println!(
                "{}: failed\nexpected output:\n{}\nactual output:\n{}",
                script.display(),
                expected_output,
                output
            );
        }
    }
    println!("{} of {} scripts passed", scripts.len() - failed, scripts.len());
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// stdout of the script, followed by stderr if the interpreter failed
fn run_script(script: &Path) -> Result<String> {
    let out = Command::new(INTERPRETER)
        .arg(script)
        .output()
        .with_context(|| format!("running script {}", script.display()))?;
    let mut output = String::from_utf8(out.stdout)?;
    if !out.status.success() {
        output.push_str(&String::from_utf8(out.stderr)?);
    }
    Ok(output)
}

fn compile_fracs() -> Result<()> {
    let st = Command::new("cargo")
        .args(["build", "--release", "-p", "fracs"])
        .current_dir("..")
        .status()?;
    if st.success() {
        Ok(())
    } else {
        Err(anyhow!("compiling the interpreter failed"))
    }
}

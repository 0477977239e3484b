//! contains small utility functions that have nowhere else to go

/// returns the crate version
pub fn get_version() -> [u16; 3] {
    let mut parts = env!("CARGO_PKG_VERSION")
        .split('.')
        .map(|x| x.parse::<u16>().unwrap_or(0));
    [
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    ]
}

/// turns an iterator of results into a result of a vec, stopping at the first error
pub fn sequence_result<T, E>(iter: impl IntoIterator<Item = Result<T, E>>) -> Result<Vec<T>, E> {
    iter.into_iter().collect()
}

/// folds `first (op rhs)*` left associatively
pub fn fold_left<T, O, E>(
    first: T,
    rest: impl IntoIterator<Item = Result<(O, T), E>>,
    mut combine: impl FnMut(T, O, T) -> T,
) -> Result<T, E> {
    rest.into_iter().try_fold(first, |acc, item| {
        let (op, rhs) = item?;
        Ok(combine(acc, op, rhs))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_matches_manifest() {
        assert_eq!(get_version(), [0, 1, 0]);
    }

    #[test]
    fn fold_left_is_left_associative() {
        let rest = vec![Ok::<_, ()>(('-', 2)), Ok(('-', 3))];
        let res = fold_left(10, rest, |a, _, b| a - b);
        assert_eq!(res, Ok(5));
    }
}

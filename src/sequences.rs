// WHY: Thin adapter that turns a named progression into a concrete skip list for
// search_sequence; the engine itself never knows about progression names

use crate::error::{ElsError, Result};

/// Longest progression `generate` will produce
pub const MAX_SEQUENCE_LEN: usize = 100_000;

/// Named skip progressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    Primes,
    /// 1, 2, 3, 5, 8, ... (the repeated leading 1 is dropped)
    Fibonacci,
    Squares,
    Triangular,
    PowersOfTwo,
    Arithmetic { start: usize, step: usize },
}

/// First `count` terms of `kind`, stopping early rather than overflowing
pub fn generate(kind: SequenceKind, count: usize) -> Result<Vec<usize>> {
    if count > MAX_SEQUENCE_LEN {
        return Err(ElsError::invalid(
            "sequence_len",
            format!("{count} exceeds the limit of {MAX_SEQUENCE_LEN} skips"),
        ));
    }
    let mut out = Vec::new();
    match kind {
        SequenceKind::Primes => {
            let mut candidate = 2usize;
            while out.len() < count {
                if is_prime(candidate) {
                    out.push(candidate);
                }
                match candidate.checked_add(1) {
                    Some(next) => candidate = next,
                    None => break,
                }
            }
        }
        SequenceKind::Fibonacci => {
            let (mut a, mut b) = (1usize, 2usize);
            while out.len() < count {
                out.push(a);
                let Some(next) = a.checked_add(b) else { break };
                a = b;
                b = next;
            }
        }
        SequenceKind::Squares => {
            push_while(&mut out, count, |n| n.checked_mul(n));
        }
        SequenceKind::Triangular => {
            push_while(&mut out, count, |n| n.checked_mul(n + 1).map(|x| x / 2));
        }
        SequenceKind::PowersOfTwo => {
            push_while(&mut out, count, |n| {
                u32::try_from(n - 1).ok().and_then(|exp| 1usize.checked_shl(exp))
            });
        }
        SequenceKind::Arithmetic { start, step } => {
            let mut value = start;
            while out.len() < count {
                if value > 0 {
                    out.push(value);
                } else if step == 0 {
                    break;
                }
                match value.checked_add(step) {
                    Some(next) if step > 0 => value = next,
                    _ => break,
                }
            }
        }
    }
    Ok(out)
}

/// Push `term(n)` for n = 1, 2, ... until `count` terms or the first overflow
fn push_while(out: &mut Vec<usize>, count: usize, term: impl Fn(usize) -> Option<usize>) {
    for n in 1..=count {
        match term(n) {
            Some(value) => out.push(value),
            None => break,
        }
    }
}

fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d <= n / d {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primes() {
        assert_eq!(generate(SequenceKind::Primes, 8).unwrap(), vec![2, 3, 5, 7, 11, 13, 17, 19]);
    }

    #[test]
    fn test_fibonacci() {
        assert_eq!(generate(SequenceKind::Fibonacci, 7).unwrap(), vec![1, 2, 3, 5, 8, 13, 21]);
    }

    #[test]
    fn test_polynomial_progressions() {
        assert_eq!(generate(SequenceKind::Squares, 5).unwrap(), vec![1, 4, 9, 16, 25]);
        assert_eq!(generate(SequenceKind::Triangular, 5).unwrap(), vec![1, 3, 6, 10, 15]);
        assert_eq!(generate(SequenceKind::PowersOfTwo, 5).unwrap(), vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn test_arithmetic() {
        let kind = SequenceKind::Arithmetic { start: 7, step: 7 };
        assert_eq!(generate(kind, 4).unwrap(), vec![7, 14, 21, 28]);
        // a zero start is skipped, not emitted
        let kind = SequenceKind::Arithmetic { start: 0, step: 5 };
        assert_eq!(generate(kind, 3).unwrap(), vec![5, 10, 15]);
        let kind = SequenceKind::Arithmetic { start: 4, step: 0 };
        assert_eq!(generate(kind, 3).unwrap(), vec![4]);
    }

    #[test]
    fn test_zero_count_and_overflow() {
        assert!(generate(SequenceKind::Primes, 0).unwrap().is_empty());
        let powers = generate(SequenceKind::PowersOfTwo, 500).unwrap();
        assert_eq!(powers.len(), usize::BITS as usize);
    }

    #[test]
    fn test_oversized_count_rejected() {
        let err = generate(SequenceKind::Primes, usize::MAX).unwrap_err();
        assert!(err.is_invalid_parameter());
        assert!(generate(SequenceKind::Squares, MAX_SEQUENCE_LEN + 1).is_err());
        let longest = generate(SequenceKind::Arithmetic { start: 1, step: 1 }, MAX_SEQUENCE_LEN).unwrap();
        assert_eq!(longest.len(), MAX_SEQUENCE_LEN);
    }
}

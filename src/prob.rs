use serde::{Deserialize, Serialize};

/// Integer percentages that always sum to exactly 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentTriple {
    pub a: i32,
    pub b: i32,
    pub c: i32,
}

impl PercentTriple {
    pub fn sum(&self) -> i32 {
        self.a + self.b + self.c
    }
}

/// Normalizes three non-negative weights to integer percentages; the rounding
/// remainder goes to the largest bucket (first one on ties).
pub fn percent_triple(a: f64, b: f64, c: f64) -> PercentTriple {
    let clean = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
    let (a, b, c) = (clean(a), clean(b), clean(c));
    let sum = a + b + c;
    if sum <= 0.0 {
        return PercentTriple { a: 34, b: 33, c: 33 };
    }

    let mut out = [
        (a / sum * 100.0).round() as i32,
        (b / sum * 100.0).round() as i32,
        (c / sum * 100.0).round() as i32,
    ];
    let raw = [a, b, c];
    let largest = (0..3)
        .fold(0usize, |best, i| if raw[i] > raw[best] { i } else { best });
    let residue = 100 - out.iter().sum::<i32>();
    out[largest] += residue;

    PercentTriple {
        a: out[0],
        b: out[1],
        c: out[2],
    }
}

pub fn poisson_pmf(lambda: f64, max_k: u32) -> Vec<f64> {
    let max_k = max_k as usize;
    let mut out = vec![0.0; max_k + 1];
    let lambda = lambda.max(0.0);

    out[0] = (-lambda).exp();
    for k in 1..=max_k {
        out[k] = out[k - 1] * lambda / k as f64;
    }

    // Fold the tail into the last bucket.
    let sum: f64 = out.iter().sum();
    if sum < 1.0 {
        out[max_k] += 1.0 - sum;
    }
    out
}

/// Joint scoreline grid from independent Poisson goal counts.
pub fn score_grid(lambda_home: f64, lambda_away: f64, max_goals: u32) -> Vec<(u32, u32, f64)> {
    let pmf_h = poisson_pmf(lambda_home, max_goals);
    let pmf_a = poisson_pmf(lambda_away, max_goals);
    let mut out = Vec::with_capacity(pmf_h.len() * pmf_a.len());
    for (h, p_h) in pmf_h.iter().enumerate() {
        for (a, p_a) in pmf_a.iter().enumerate() {
            out.push((h as u32, a as u32, p_h * p_a));
        }
    }
    out
}

/// (home, draw, away) probabilities from a scoreline grid.
pub fn outcome_probs(grid: &[(u32, u32, f64)]) -> (f64, f64, f64) {
    let mut p_home = 0.0;
    let mut p_draw = 0.0;
    let mut p_away = 0.0;
    for (h, a, p) in grid {
        if h > a {
            p_home += p;
        } else if h < a {
            p_away += p;
        } else {
            p_draw += p;
        }
    }
    let sum = p_home + p_draw + p_away;
    if sum > 0.0 {
        (p_home / sum, p_draw / sum, p_away / sum)
    } else {
        (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_triple_sums_to_100() {
        for (a, b, c) in [
            (1.0, 1.0, 1.0),
            (0.333, 0.333, 0.334),
            (0.455, 0.275, 0.27),
            (5.0, 0.0, 0.0),
            (0.0, 0.0, 0.0),
            (0.166, 0.167, 0.667),
        ] {
            let t = percent_triple(a, b, c);
            assert_eq!(t.sum(), 100, "{a} {b} {c} -> {t:?}");
        }
    }

    #[test]
    fn remainder_lands_on_largest_bucket() {
        // 33.33 each rounds to 33; the +1 goes to the first largest.
        let t = percent_triple(1.0, 1.0, 1.0);
        assert_eq!((t.a, t.b, t.c), (34, 33, 33));
        let t = percent_triple(0.2, 0.2, 0.6);
        assert_eq!((t.a, t.b, t.c), (20, 20, 60));
    }

    #[test]
    fn poisson_mass_is_complete() {
        let pmf = poisson_pmf(1.4, 10);
        let sum: f64 = pmf.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn stronger_home_side_is_favoured() {
        let grid = score_grid(1.9, 0.8, 10);
        let (h, d, a) = outcome_probs(&grid);
        assert!(h > a);
        assert!((h + d + a - 1.0).abs() < 1e-9);
    }
}

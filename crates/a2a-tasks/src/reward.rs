//! Reward scoring: linear/exponential/tiered multiplier formulas plus a
//! quality bonus. Rewards never move tokens directly; they only size the
//! amount an escrow release pays out.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardFormula {
    Linear,
    Exponential,
    Tiered,
}

fn multiplier(formula: RewardFormula, quality_score: f64) -> f64 {
    let fraction = (quality_score / 100.0).clamp(0.0, 1.0);
    match formula {
        RewardFormula::Linear => fraction,
        RewardFormula::Exponential => fraction.sqrt(),
        RewardFormula::Tiered => {
            if quality_score >= 90.0 {
                1.5
            } else if quality_score >= 75.0 {
                1.2
            } else if quality_score >= 60.0 {
                1.0
            } else if quality_score >= 40.0 {
                0.7
            } else {
                0.5
            }
        }
    }
}

fn bonus(formula_base: f64, quality_score: f64) -> f64 {
    if quality_score >= 95.0 {
        formula_base * 0.2
    } else if quality_score >= 90.0 {
        formula_base * 0.1
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub base_reward: u64,
    pub quality_score: f64,
    pub formula: RewardFormula,
    pub multiplier: f64,
    pub calculated_reward: f64,
    pub bonus: f64,
    pub total_reward: u64,
}

/// Computes `final = base * multiplier + bonus`. The result is rounded
/// down to the nearest whole token since escrow amounts are `u64`.
pub fn calculate_reward(base_reward: u64, quality_score: f64, formula: RewardFormula) -> RewardBreakdown {
    let base = base_reward as f64;
    let m = multiplier(formula, quality_score);
    let calculated = base * m;
    let bonus_amount = bonus(base, quality_score);
    let total = calculated + bonus_amount;

    RewardBreakdown {
        base_reward,
        quality_score,
        formula,
        multiplier: m,
        calculated_reward: calculated,
        bonus: bonus_amount,
        total_reward: total.floor() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_scales_with_score() {
        let r = calculate_reward(100, 80.0, RewardFormula::Linear);
        assert_eq!(r.total_reward, 80);
    }

    #[test]
    fn bonus_applies_above_95() {
        let r = calculate_reward(100, 96.0, RewardFormula::Linear);
        // 100 * 0.96 + 100*0.2 = 96 + 20 = 116
        assert_eq!(r.total_reward, 116);
    }

    #[test]
    fn bonus_applies_above_90() {
        let r = calculate_reward(100, 92.0, RewardFormula::Linear);
        // 100 * 0.92 + 10 = 102
        assert_eq!(r.total_reward, 102);
    }

    #[test]
    fn tiered_formula_rewards_excellence() {
        let r = calculate_reward(100, 92.0, RewardFormula::Tiered);
        // multiplier 1.5, plus bonus 10 = 150 + 10 = 160
        assert_eq!(r.total_reward, 160);
    }

    #[test]
    fn exponential_formula_between_linear_and_one() {
        let linear = calculate_reward(100, 50.0, RewardFormula::Linear).calculated_reward;
        let exponential = calculate_reward(100, 50.0, RewardFormula::Exponential).calculated_reward;
        assert!(exponential > linear);
    }
}

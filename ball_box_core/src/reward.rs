/// Paid on the step the ball lands in the box.
pub const GOAL_REWARD: f32 = 100.0;

/// Paid on every other step.
pub const STEP_PENALTY: f32 = -1.0;

/// Scores a transition by whether it reached the goal.
pub fn reward(goal_reached: bool) -> f32 {
    if goal_reached {
        GOAL_REWARD
    } else {
        STEP_PENALTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_values() {
        assert_eq!(reward(true), 100.0);
        assert_eq!(reward(false), -1.0);
    }
}

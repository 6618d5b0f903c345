//! Control command implementation.

use anyhow::Result;

use qcoin_games::control::{
    DEFAULT_SHOTS, adaptive_multilevel, cheat_detection_if_else, conditional_penalty,
    retry_while, run_all_control,
};

use super::common::blocking;
use crate::ControlPart;

/// Execute the control command.
pub async fn execute(
    part: ControlPart,
    max_attempts: u32,
    shots: Option<u32>,
    seed: Option<u64>,
) -> Result<()> {
    blocking(move || {
        match part {
            ControlPart::IfElse => {
                cheat_detection_if_else(shots.unwrap_or(DEFAULT_SHOTS[0]), seed)?;
            }
            ControlPart::While => {
                retry_while(shots.unwrap_or(DEFAULT_SHOTS[1]), max_attempts, seed)?;
            }
            ControlPart::Penalty => {
                conditional_penalty(shots.unwrap_or(DEFAULT_SHOTS[2]), seed)?;
            }
            ControlPart::Multilevel => {
                adaptive_multilevel(shots.unwrap_or(DEFAULT_SHOTS[3]), seed)?;
            }
            ControlPart::All => {
                run_all_control(max_attempts, shots, seed)?;
            }
        }
        Ok(())
    })
    .await
}

//! Coin-flip game circuits.
//!
//! Each player owns one qubit. A player who flips honestly applies `H`;
//! the cheater leaves the qubit in |0⟩. In the counterattack variant a
//! third player answers with a coin that always reads 1.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use qcoin_ir::{IrResult, MemoryType, Program};

/// The three game variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    /// Both players flip honestly.
    #[default]
    Fair,
    /// Player 1 never flips and always reads 0.
    Cheater,
    /// Player 1 cheats, player 3 always reads 1.
    Counterattack,
}

impl GameKind {
    /// Every variant, in presentation order.
    pub const ALL: [GameKind; 3] = [GameKind::Fair, GameKind::Cheater, GameKind::Counterattack];

    /// Qubits (players) the game needs.
    pub fn num_qubits(self) -> u32 {
        match self {
            GameKind::Fair | GameKind::Cheater => 2,
            GameKind::Counterattack => 3,
        }
    }

    /// Name of the machine the game runs on, e.g. `2q-qvm`.
    pub fn qc_name(self) -> String {
        format!("{}q-qvm", self.num_qubits())
    }

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            GameKind::Fair => "fair",
            GameKind::Cheater => "cheater",
            GameKind::Counterattack => "counterattack",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A game name that [`GameKind::from_str`] does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown game '{0}' (expected fair, cheater or counterattack)")]
pub struct UnknownGameError(pub String);

impl FromStr for GameKind {
    type Err = UnknownGameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fair" | "justo" => Ok(GameKind::Fair),
            "cheater" | "tramposo" => Ok(GameKind::Cheater),
            "counterattack" | "contraataque" => Ok(GameKind::Counterattack),
            _ => Err(UnknownGameError(s.to_string())),
        }
    }
}

/// Build the circuit for `kind`, measuring qubit `i` into `ro[i]` for
/// `i < num_qubits`.
pub fn game_program(kind: GameKind, num_qubits: u32) -> IrResult<Program> {
    let mut program = Program::new();
    let ro = program.declare("ro", MemoryType::Bit, num_qubits as usize)?;

    match kind {
        GameKind::Fair => {
            program.h(0)?.h(1)?;
        }
        GameKind::Cheater => {
            program.h(1)?;
        }
        GameKind::Counterattack => {
            program.h(1)?.x(2)?;
        }
    }

    program.measure_all(&ro);
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_game_kind() {
        assert_eq!("fair".parse::<GameKind>().unwrap(), GameKind::Fair);
        assert_eq!("Tramposo".parse::<GameKind>().unwrap(), GameKind::Cheater);
        assert_eq!(
            "contraataque".parse::<GameKind>().unwrap(),
            GameKind::Counterattack
        );
        assert!("poker".parse::<GameKind>().is_err());
    }

    #[test]
    fn test_num_qubits() {
        assert_eq!(GameKind::Fair.num_qubits(), 2);
        assert_eq!(GameKind::Cheater.qc_name(), "2q-qvm");
        assert_eq!(GameKind::Counterattack.qc_name(), "3q-qvm");
    }

    #[test]
    fn test_fair_program_text() {
        let program = game_program(GameKind::Fair, 2).unwrap();
        assert_eq!(
            program.to_string(),
            "DECLARE ro BIT[2]\nH 0\nH 1\nMEASURE 0 ro[0]\nMEASURE 1 ro[1]\n"
        );
    }

    #[test]
    fn test_cheater_leaves_player_one_alone() {
        let program = game_program(GameKind::Cheater, 2).unwrap();
        assert_eq!(program.qubits().len(), 2);
        assert_eq!(program.instructions().iter().filter(|i| i.is_gate()).count(), 1);
    }

    #[test]
    fn test_counterattack_program() {
        let program = game_program(GameKind::Counterattack, 3).unwrap();
        assert_eq!(program.num_qubits(), 3);
        assert_eq!(program.declaration("ro").unwrap().size, 3);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&GameKind::Counterattack).unwrap();
        assert_eq!(json, "\"counterattack\"");
    }
}

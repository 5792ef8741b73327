//! Match and standings recording.
//!
//! Matches append freely while a tournament is in progress; standings are
//! validated once, at conclusion, and everything is read-only afterwards.

use std::collections::BTreeSet;

use super::models::Standing;

/// Check that submitted standings cover positions `1..=N` exactly, with no
/// gaps, duplicates, or repeated players.
///
/// Returns a human-readable description of the first violation found.
pub fn validate_standings(standings: &[Standing]) -> Result<(), String> {
    if standings.is_empty() {
        return Err("no standings supplied".to_string());
    }

    let mut positions = BTreeSet::new();
    let mut players = BTreeSet::new();
    for standing in standings {
        if standing.position == 0 {
            return Err("positions are 1-indexed; got position 0".to_string());
        }
        if !positions.insert(standing.position) {
            return Err(format!("duplicate position {}", standing.position));
        }
        if !players.insert(standing.player_id) {
            return Err(format!(
                "player {} appears in more than one standing",
                standing.player_id
            ));
        }
    }

    let n = standings.len() as u32;
    if let Some(&highest) = positions.iter().next_back()
        && highest != n
    {
        return Err(format!(
            "positions must be contiguous from 1: got {n} standings but highest position {highest}"
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(player_id: i64, position: u32) -> Standing {
        Standing {
            player_id,
            position,
        }
    }

    #[test]
    fn test_contiguous_standings_accepted() {
        let standings = vec![standing(3, 2), standing(1, 1), standing(7, 3)];
        assert!(validate_standings(&standings).is_ok());
    }

    #[test]
    fn test_gap_rejected() {
        // {1, 3} is the canonical bad submission.
        let standings = vec![standing(1, 1), standing(2, 3)];
        assert!(validate_standings(&standings).is_err());
    }

    #[test]
    fn test_duplicate_position_rejected() {
        let standings = vec![standing(1, 1), standing(2, 1)];
        assert!(validate_standings(&standings).is_err());
    }

    #[test]
    fn test_duplicate_player_rejected() {
        let standings = vec![standing(1, 1), standing(1, 2)];
        assert!(validate_standings(&standings).is_err());
    }

    #[test]
    fn test_zero_position_rejected() {
        assert!(validate_standings(&[standing(1, 0)]).is_err());
    }

    #[test]
    fn test_empty_standings_rejected() {
        assert!(validate_standings(&[]).is_err());
    }
}

use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub fn check_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Classroom name is required"));
    }
    Ok(name.to_string())
}

pub fn check_capacity(capacity: Option<i32>) -> AppResult<()> {
    match capacity {
        Some(c) if c <= 0 => Err(AppError::validation("Capacity must be positive")),
        _ => Ok(()),
    }
}

/// Rejects an enrollment that would push the roster past `capacity`.
pub fn check_room_for(capacity: Option<i32>, enrolled: i64, incoming: i64) -> AppResult<()> {
    match capacity {
        Some(c) if enrolled + incoming > i64::from(c) => Err(AppError::validation(format!(
            "Classroom capacity exceeded ({} enrolled, {} requested, capacity {})",
            enrolled, incoming, c
        ))),
        _ => Ok(()),
    }
}

/// Order-preserving dedupe of the requested student ids.
pub fn distinct_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_must_be_positive_when_set() {
        assert!(check_capacity(None).is_ok());
        assert!(check_capacity(Some(30)).is_ok());
        assert!(check_capacity(Some(0)).is_err());
        assert!(check_capacity(Some(-2)).is_err());
    }

    #[test]
    fn room_check_counts_current_and_incoming() {
        assert!(check_room_for(None, 500, 500).is_ok());
        assert!(check_room_for(Some(3), 1, 2).is_ok());
        let err = check_room_for(Some(3), 2, 2).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn distinct_ids_keeps_first_occurrence() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(distinct_ids(&[a, b, a, b]), vec![a, b]);
    }

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(check_name("  Room 4 ").unwrap(), "Room 4");
        assert!(check_name("   ").is_err());
    }
}

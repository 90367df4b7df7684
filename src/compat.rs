//! Point-kind compatibility rules.
//!
//! | Kind        | Bonds with                                                   |
//! |-------------|--------------------------------------------------------------|
//! | Universal   | everything                                                   |
//! | Structural  | Structural, Linkage                                          |
//! | WheelMount  | WheelMount, Linkage                                          |
//! | MotorMount  | MotorMount, Linkage                                          |
//! | Linkage     | Linkage, Structural, WheelMount, MotorMount, ToolMount, SeatMount |
//! | ToolMount   | ToolMount, Linkage                                           |
//! | SeatMount   | SeatMount, Linkage                                           |
//!
//! Universal always bonds, and identical kinds always bond.

use crate::types::PointKind;

/// Whether two point kinds may be connected. Symmetric and total.
pub fn compatible(a: PointKind, b: PointKind) -> bool {
    use PointKind::*;

    match (a, b) {
        (Universal, _) | (_, Universal) => true,
        _ if a == b => true,
        (Linkage, other) | (other, Linkage) => {
            matches!(other, Structural | WheelMount | MotorMount | ToolMount | SeatMount)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PointKind::*;

    #[test]
    fn test_universal_bonds_with_everything() {
        for kind in PointKind::ALL {
            assert!(compatible(Universal, kind));
            assert!(compatible(kind, Universal));
        }
    }

    #[test]
    fn test_identical_kinds_bond() {
        for kind in PointKind::ALL {
            assert!(compatible(kind, kind), "{kind} should bond with itself");
        }
    }

    #[test]
    fn test_symmetry() {
        for a in PointKind::ALL {
            for b in PointKind::ALL {
                assert_eq!(compatible(a, b), compatible(b, a), "{a} / {b}");
            }
        }
    }

    #[test]
    fn test_linkage_adapts_mounts() {
        for kind in [Structural, WheelMount, MotorMount, ToolMount, SeatMount] {
            assert!(compatible(Linkage, kind));
        }
    }

    #[test]
    fn test_cross_mount_pairs_rejected() {
        assert!(!compatible(WheelMount, ToolMount));
        assert!(!compatible(WheelMount, MotorMount));
        assert!(!compatible(Structural, WheelMount));
        assert!(!compatible(Structural, SeatMount));
        assert!(!compatible(ToolMount, SeatMount));
        assert!(!compatible(MotorMount, SeatMount));
    }

    #[test]
    fn test_full_table_count() {
        // 7 pairs involving Universal, 6 other identical pairs, 5 linkage adapters.
        let mut unordered = 0;
        for (i, a) in PointKind::ALL.iter().enumerate() {
            for b in &PointKind::ALL[i..] {
                if compatible(*a, *b) {
                    unordered += 1;
                }
            }
        }
        assert_eq!(unordered, 7 + 6 + 5);
    }
}

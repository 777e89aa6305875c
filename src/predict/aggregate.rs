//! Sequence-level logit fusion.
//!
//! All items of a trigger-event sequence are fused into a single verdict:
//! animal evidence wins over human and vehicle evidence, which in turn wins
//! over empty items, and the winning label is derived from a softmax over the
//! column-wise mean of the contributing logit rows.

use super::state::Fused;
use crate::constants::SINGLE_ROW_TEMPERATURE;
use crate::taxonomy::{ClassCatalog, EMPTY_LABEL, UNDEFINED_LABEL};

/// Fuse the logit rows of one sequence into a verdict.
///
/// A row counts as empty, human or vehicle if the corresponding column is
/// positive, and as animal otherwise. With at least one animal row, the
/// verdict is the argmax of the mean animal logits over the allowed columns
/// (a single contributing row is tempered before the softmax, it tends to be
/// overconfident). With no animal rows, human and vehicle compete by row
/// majority at full confidence, humans winning ties. Animal rows whose every
/// animal column is forbidden, with no human or vehicle rows to fall back
/// on, yield undefined at score 0.0. A score below `threshold` demotes the
/// label to undefined while `top1` keeps the winner.
///
/// `forbidden` lists animal column indices excluded from the argmax.
/// The returned score is truncated to two decimals; the threshold comparison
/// happens before truncation.
pub fn fuse_sequence(
    rows: &[&[f32]],
    catalog: &ClassCatalog,
    forbidden: &[usize],
    threshold: f32,
) -> Fused {
    let human_index = catalog.human_index();
    let vehicle_index = catalog.vehicle_index();
    let empty_index = catalog.empty_index();

    let mut animal_rows: Vec<&[f32]> = Vec::new();
    let mut humans = 0usize;
    let mut vehicles = 0usize;
    let mut empties = 0usize;
    for row in rows {
        if row[empty_index] > 0.0 {
            empties += 1;
        } else if row[human_index] > 0.0 {
            humans += 1;
        } else if row[vehicle_index] > 0.0 {
            vehicles += 1;
        } else {
            animal_rows.push(row);
        }
    }

    if empties == rows.len() {
        return Fused {
            label: EMPTY_LABEL.to_string(),
            score: 1.0,
            top1: EMPTY_LABEL.to_string(),
        };
    }

    let columns: Vec<usize> = (0..catalog.num_animal_classes())
        .filter(|c| !forbidden.contains(c))
        .collect();

    let (best_index, best_score) = if animal_rows.is_empty() || columns.is_empty() {
        if humans == 0 && vehicles == 0 {
            // Animal evidence with every animal class forbidden: there is no
            // winner to report.
            return Fused {
                label: UNDEFINED_LABEL.to_string(),
                score: 0.0,
                top1: UNDEFINED_LABEL.to_string(),
            };
        }
        if humans >= vehicles {
            (human_index, 1.0)
        } else {
            (vehicle_index, 1.0)
        }
    } else {
        let mut mean = vec![0.0f32; columns.len()];
        for row in &animal_rows {
            for (j, &c) in columns.iter().enumerate() {
                mean[j] += row[c];
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let divisor = animal_rows.len() as f32;
        let temperature = if animal_rows.len() == 1 {
            SINGLE_ROW_TEMPERATURE
        } else {
            1.0
        };
        for v in &mut mean {
            *v = *v / divisor / temperature;
        }

        let best = mean
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map_or(0, |(j, _)| j);
        // Softmax of the winning column, shifted for numerical stability.
        let max = mean[best];
        let denominator: f32 = mean.iter().map(|v| (v - max).exp()).sum();
        (columns[best], 1.0 / denominator)
    };

    let top1 = catalog.label(best_index).to_string();
    let label = if best_score < threshold {
        UNDEFINED_LABEL.to_string()
    } else {
        top1.clone()
    };
    Fused {
        label,
        score: (best_score * 100.0).floor() / 100.0,
        top1,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_LOGIT;
    use crate::taxonomy::{HUMAN_LABEL, VEHICLE_LABEL};

    fn catalog() -> ClassCatalog {
        ClassCatalog::new(vec![
            "badger".to_string(),
            "fox".to_string(),
            "bird".to_string(),
        ])
    }

    fn empty_row(catalog: &ClassCatalog) -> Vec<f32> {
        let mut row = vec![0.0; catalog.row_len()];
        row[catalog.empty_index()] = DEFAULT_LOGIT;
        row
    }

    fn animal_row(catalog: &ClassCatalog, logits: &[f32]) -> Vec<f32> {
        let mut row = vec![0.0; catalog.row_len()];
        row[..logits.len()].copy_from_slice(logits);
        row
    }

    #[test]
    fn test_all_empty_sequence() {
        let catalog = catalog();
        let rows = vec![empty_row(&catalog), empty_row(&catalog)];
        let refs: Vec<&[f32]> = rows.iter().map(Vec::as_slice).collect();
        let fused = fuse_sequence(&refs, &catalog, &[], 0.8);
        assert_eq!(fused.label, EMPTY_LABEL);
        assert_eq!(fused.score, 1.0);
    }

    #[test]
    fn test_single_animal_row_beats_empties() {
        let catalog = catalog();
        let rows = vec![
            empty_row(&catalog),
            animal_row(&catalog, &[0.0, DEFAULT_LOGIT, 0.0]),
            empty_row(&catalog),
        ];
        let refs: Vec<&[f32]> = rows.iter().map(Vec::as_slice).collect();
        let fused = fuse_sequence(&refs, &catalog, &[], 0.8);
        assert_eq!(fused.label, "fox");
        assert_eq!(fused.top1, "fox");
        // Near-certain softmax truncates to 0.99, never rounds to 1.0.
        assert_eq!(fused.score, 0.99);
    }

    #[test]
    fn test_low_score_demoted_to_undefined() {
        let catalog = catalog();
        let rows = vec![
            animal_row(&catalog, &[1.0, 0.5, 0.0]),
            animal_row(&catalog, &[1.0, 0.5, 0.0]),
        ];
        let refs: Vec<&[f32]> = rows.iter().map(Vec::as_slice).collect();
        let fused = fuse_sequence(&refs, &catalog, &[], 0.8);
        assert_eq!(fused.label, UNDEFINED_LABEL);
        assert_eq!(fused.top1, "badger");
        assert!(fused.score < 0.8);
    }

    #[test]
    fn test_human_vehicle_majority_tie_goes_to_human() {
        let catalog = catalog();
        let mut human = vec![0.0; catalog.row_len()];
        human[catalog.human_index()] = DEFAULT_LOGIT;
        let mut vehicle = vec![0.0; catalog.row_len()];
        vehicle[catalog.vehicle_index()] = DEFAULT_LOGIT;
        let rows = vec![human, vehicle];
        let refs: Vec<&[f32]> = rows.iter().map(Vec::as_slice).collect();
        let fused = fuse_sequence(&refs, &catalog, &[], 0.8);
        assert_eq!(fused.label, HUMAN_LABEL);
        assert_eq!(fused.score, 1.0);
    }

    #[test]
    fn test_vehicle_majority_wins() {
        let catalog = catalog();
        let mut vehicle = vec![0.0; catalog.row_len()];
        vehicle[catalog.vehicle_index()] = DEFAULT_LOGIT;
        let rows = vec![vehicle.clone(), vehicle];
        let refs: Vec<&[f32]> = rows.iter().map(Vec::as_slice).collect();
        let fused = fuse_sequence(&refs, &catalog, &[], 0.8);
        assert_eq!(fused.label, VEHICLE_LABEL);
    }

    #[test]
    fn test_forbidden_column_excluded() {
        let catalog = catalog();
        let rows = vec![animal_row(&catalog, &[2.0, DEFAULT_LOGIT, 0.0])];
        let refs: Vec<&[f32]> = rows.iter().map(Vec::as_slice).collect();
        let forbidden = catalog.resolve_species(&["fox".to_string()]).unwrap();
        let fused = fuse_sequence(&refs, &catalog, &forbidden, 0.8);
        assert_eq!(fused.top1, "badger");
    }

    #[test]
    fn test_all_animal_columns_forbidden_is_undefined() {
        let catalog = catalog();
        let rows = vec![animal_row(&catalog, &[2.0, DEFAULT_LOGIT, 0.0])];
        let refs: Vec<&[f32]> = rows.iter().map(Vec::as_slice).collect();
        let forbidden: Vec<usize> = (0..catalog.num_animal_classes()).collect();
        let fused = fuse_sequence(&refs, &catalog, &forbidden, 0.8);
        assert_eq!(fused.label, UNDEFINED_LABEL);
        assert_eq!(fused.top1, UNDEFINED_LABEL);
        assert_eq!(fused.score, 0.0);
    }

    #[test]
    fn test_fusion_is_deterministic() {
        let catalog = catalog();
        let rows = vec![
            animal_row(&catalog, &[3.0, 1.0, 0.5]),
            animal_row(&catalog, &[2.0, 2.5, 0.5]),
        ];
        let refs: Vec<&[f32]> = rows.iter().map(Vec::as_slice).collect();
        let a = fuse_sequence(&refs, &catalog, &[], 0.8);
        let b = fuse_sequence(&refs, &catalog, &[], 0.8);
        assert_eq!(a, b);
    }
}

use super::target::{wins, HeatingTarget};

/// How a new target relates, in time, to an existing one.
#[derive(Debug, PartialEq, Clone, Copy)]
enum Intersection {
    None,
    /// existing: ---||||||---
    /// new:      -----||||||-
    StartsInTarget,
    /// existing: ---||||||---
    /// new:      -||||||-----
    EndsInTarget,
    /// existing: ----||||----
    /// new:      --||||||||--
    EnclosesTarget,
    /// existing: --||||||||--
    /// new:      ----||||----
    EmbeddedInTarget,
}

fn intersection(existing: &HeatingTarget, new: &HeatingTarget) -> Intersection {
    if new.start <= existing.start && new.end >= existing.end {
        return Intersection::EnclosesTarget;
    }
    let starts_in = new.start >= existing.start && new.start <= existing.end;
    let ends_in = new.end >= existing.start && new.end <= existing.end;
    match (starts_in, ends_in) {
        (true, true) => Intersection::EmbeddedInTarget,
        (true, false) => Intersection::StartsInTarget,
        (false, true) => Intersection::EndsInTarget,
        (false, false) => Intersection::None,
    }
}

/// Merges `new_target` into a disjoint list of targets sorted by start.
/// Wherever the two overlap the loser (see [wins]) is truncated, split or removed,
/// the winner is kept whole. The result is again disjoint and sorted by start, and
/// covers the union of the previous list and the new target.
pub fn merge_into(targets: Vec<HeatingTarget>, new_target: HeatingTarget) -> Vec<HeatingTarget> {
    let mut candidate = Some(new_target);
    let mut remove = vec![false; targets.len()];
    let mut add = Vec::new();

    for (i, existing) in targets.iter().enumerate() {
        let Some(current) = candidate.as_mut() else {
            break;
        };
        let candidate_wins = wins(existing, current);

        match intersection(existing, current) {
            Intersection::None => {}
            Intersection::StartsInTarget => {
                if candidate_wins {
                    remove[i] = true;
                    add.push(existing.with_end(current.start));
                } else {
                    current.start = existing.end;
                }
            }
            Intersection::EndsInTarget => {
                if candidate_wins {
                    remove[i] = true;
                    add.push(existing.with_start(current.end));
                } else {
                    current.end = existing.start;
                }
            }
            Intersection::EnclosesTarget => {
                if candidate_wins {
                    remove[i] = true;
                } else {
                    add.push(current.with_end(existing.start));
                    current.start = existing.end;
                }
            }
            Intersection::EmbeddedInTarget => {
                if candidate_wins {
                    remove[i] = true;
                    add.push(existing.with_end(current.start));
                    add.push(existing.with_start(current.end));
                } else {
                    candidate = None;
                }
                // Nothing else can overlap something embedded in a disjoint entry.
                break;
            }
        }
    }

    let mut result: Vec<HeatingTarget> = targets
        .into_iter()
        .zip(remove)
        .filter_map(|(target, removed)| (!removed).then_some(target))
        .chain(add)
        .chain(candidate)
        .filter(|target| !target.is_empty())
        .collect();
    result.sort_by_key(|target| target.start);
    result
}

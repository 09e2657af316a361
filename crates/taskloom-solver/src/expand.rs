//! Task expansion (§4.4): rewrites multi-assignee and parallelizable tasks
//! into equivalent sub-task forms the scheduler can consume directly.
//! Grounded in `backend_rewrite/expand.py`'s `expand_specific_tasks` and
//! `expand_parallelizable_tasks`; applied in that fixed order (specific
//! first, then parallelizable), matching the rollback driver's pseudocode
//! in §4.6.

use std::collections::HashMap;

use taskloom_core::InputTask;

/// Splits every task with more than one specific (person) assignee into a
/// sibling per extra assignee. The base task keeps the first assignee;
/// siblings are named `<task>_specific_<n>`. Predecessors of the base task
/// fan out to name every sibling too, since the siblings are new graph
/// nodes that the scheduler will later force to share start/end times.
///
/// Returns the rewritten task list and a map from original task name to its
/// sibling names, consumed by the scheduler (synchrony constraint) and the
/// merger (assignee recombination).
#[tracing::instrument(skip_all, fields(tasks = tasks.len()))]
pub fn expand_specific(tasks: Vec<InputTask>) -> (Vec<InputTask>, HashMap<String, Vec<String>>) {
    let mut ret = tasks;
    let mut to_add = Vec::new();
    let mut map: HashMap<String, Vec<String>> = HashMap::new();

    for t in ret.iter_mut() {
        if t.specific_assignments && t.assignees.len() > 1 {
            let originals = t.assignees.clone();
            t.assignees = vec![originals[0].clone()];
            let subtasks = map.entry(t.name.clone()).or_default();
            for (i, a) in originals.iter().enumerate().skip(1) {
                let mut clone = t.clone();
                clone.name = format!("{}_specific_{i}", t.name);
                clone.assignees = vec![a.clone()];
                subtasks.push(clone.name.clone());
                to_add.push(clone);
            }
        }
    }
    ret.extend(to_add);

    // Any predecessor naming an expanded task in its `next` list must also
    // name every sibling that task fanned out into.
    for t in ret.iter_mut() {
        let extra: Vec<String> = t
            .next
            .iter()
            .filter_map(|n| map.get(n))
            .flatten()
            .cloned()
            .collect();
        t.next.extend(extra);
    }

    (ret, map)
}

/// Splits every `parallelizable` task with estimate `E >= 2` into a chain
/// of `E` unit-estimate links: `T -> T_chain_1 -> ... -> T_chain_{E-1}`. `T`
/// keeps its `start_date`; `end_date` and the original outgoing edges move
/// to the last link. Intermediate links carry no dates.
///
/// Returns the rewritten task list and a map from original task name to its
/// chain-link names, consumed by the merger to recombine estimate and
/// `end_date`.
#[tracing::instrument(skip_all, fields(tasks = tasks.len()))]
pub fn expand_parallelizable(
    tasks: Vec<InputTask>,
) -> (Vec<InputTask>, HashMap<String, Vec<String>>) {
    let mut ret = tasks;
    let mut to_add: Vec<InputTask> = Vec::new();
    let mut map: HashMap<String, Vec<String>> = HashMap::new();

    for idx in 0..ret.len() {
        if !ret[idx].parallelizable {
            continue;
        }
        let original_estimate = ret[idx].estimate.unwrap_or(0);
        let original_end = ret[idx].end_date;
        let original_next = std::mem::take(&mut ret[idx].next);
        ret[idx].end_date = None;
        ret[idx].estimate = Some(1);

        let mut chain: Vec<InputTask> = Vec::new();
        for link in 1..original_estimate {
            let mut clone = ret[idx].clone();
            clone.name = format!("{}_chain_{link}", ret[idx].name);
            clone.estimate = Some(1);
            clone.start_date = None;
            clone.end_date = None;
            clone.next = Vec::new();
            chain.push(clone);
        }

        let subtasks = map.entry(ret[idx].name.clone()).or_default();
        for c in &chain {
            subtasks.push(c.name.clone());
        }

        match chain.first() {
            Some(first) => {
                ret[idx].next = vec![first.name.clone()];
                let last = chain.len() - 1;
                for i in 0..chain.len() {
                    if i < last {
                        chain[i].next = vec![chain[i + 1].name.clone()];
                    } else {
                        chain[i].next = original_next.clone();
                        chain[i].end_date = original_end;
                    }
                }
            }
            None => {
                // estimate < 2 should already be rejected by the verifier;
                // restore the fields we tentatively cleared above.
                ret[idx].next = original_next;
                ret[idx].end_date = original_end;
            }
        }

        to_add.extend(chain);
    }

    ret.extend(to_add);
    (ret, map)
}

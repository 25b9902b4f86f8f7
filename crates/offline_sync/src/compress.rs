//! Queue compression.
//!
//! Both functions here are pure: they reduce a raw queue to the smallest
//! list of operations with the same final effect, and applying them twice
//! gives the same result as applying them once.

use crate::operation::{OneOffOp, StatusOp};
use std::collections::HashMap;
use task_model::{is_temporary_id, EntityId, OneOffPatch, TaskStatus};

/// Keep one entry per todo id, carrying the most recently queued status.
///
/// Entries come out in the order their id first appeared.
pub fn compress_status_ops(ops: &[StatusOp]) -> Vec<StatusOp> {
    let mut index: HashMap<EntityId, usize> = HashMap::new();
    let mut out: Vec<StatusOp> = Vec::new();

    for op in ops {
        match index.get(&op.id) {
            Some(&i) => out[i].status = op.status,
            None => {
                index.insert(op.id, out.len());
                out.push(*op);
            }
        }
    }
    out
}

/// Create that has not reached the server, with merged field values.
#[derive(Debug)]
struct PendingCreate {
    client_id: EntityId,
    title: String,
    description: Option<String>,
    status: Option<TaskStatus>,
}

impl PendingCreate {
    fn merge(&mut self, patch: &OneOffPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(status) = patch.status {
            self.status = Some(status);
        }
    }

    fn into_op(self) -> OneOffOp {
        OneOffOp::Create {
            client_id: self.client_id,
            title: self.title,
            description: self.description,
            status: self.status,
        }
    }
}

fn pending_create<'a>(
    creates: &'a mut [Option<PendingCreate>],
    index: &HashMap<EntityId, usize>,
    id: EntityId,
) -> Option<&'a mut PendingCreate> {
    match index.get(&id) {
        Some(&i) => creates[i].as_mut(),
        None => None,
    }
}

/// Outstanding change to an entity the server already knows.
#[derive(Debug)]
enum ExistingChange {
    Patch(OneOffPatch),
    Delete,
}

/// Reduce a one-off queue to at most one operation per entity.
///
/// - Operations on a negative id fold into that id's pending create.
/// - A delete of a pending create cancels it; nothing is emitted.
/// - A delete of a server entity wins over every other change to it.
/// - Status and update operations on a server entity merge field by field.
///
/// Output: surviving creates in first-appearance order, then one update or
/// delete per server entity in first-appearance order.
pub fn compress_oneoff_ops(ops: &[OneOffOp]) -> Vec<OneOffOp> {
    let mut creates: Vec<Option<PendingCreate>> = Vec::new();
    let mut create_index: HashMap<EntityId, usize> = HashMap::new();
    let mut existing: Vec<(EntityId, ExistingChange)> = Vec::new();
    let mut existing_index: HashMap<EntityId, usize> = HashMap::new();

    let mut change_existing = |id: EntityId, patch: Option<&OneOffPatch>| {
        let slot = *existing_index.entry(id).or_insert_with(|| {
            existing.push((id, ExistingChange::Patch(OneOffPatch::default())));
            existing.len() - 1
        });
        match (&mut existing[slot].1, patch) {
            (ExistingChange::Delete, _) => {}
            (ExistingChange::Patch(current), Some(patch)) => current.merge(patch),
            (change, None) => *change = ExistingChange::Delete,
        }
    };

    for op in ops {
        match op {
            OneOffOp::Create {
                client_id,
                title,
                description,
                status,
            } => {
                let pending = PendingCreate {
                    client_id: *client_id,
                    title: title.clone(),
                    description: description.clone(),
                    status: *status,
                };
                // A repeated create for the same client id replaces the first.
                match create_index.get(client_id) {
                    Some(&i) => creates[i] = Some(pending),
                    None => {
                        create_index.insert(*client_id, creates.len());
                        creates.push(Some(pending));
                    }
                }
            }
            OneOffOp::Status { id, status } => {
                let patch = OneOffPatch::status(*status);
                if is_temporary_id(*id) {
                    if let Some(pending) = pending_create(&mut creates, &create_index, *id) {
                        pending.merge(&patch);
                    }
                } else {
                    change_existing(*id, Some(&patch));
                }
            }
            OneOffOp::Update { id, patch } => {
                if is_temporary_id(*id) {
                    if let Some(pending) = pending_create(&mut creates, &create_index, *id) {
                        pending.merge(patch);
                    }
                } else {
                    change_existing(*id, Some(patch));
                }
            }
            OneOffOp::Delete { id } => {
                if is_temporary_id(*id) {
                    if let Some(i) = create_index.remove(id) {
                        creates[i] = None;
                    }
                } else {
                    change_existing(*id, None);
                }
            }
        }
    }

    let mut out: Vec<OneOffOp> = creates
        .into_iter()
        .flatten()
        .map(PendingCreate::into_op)
        .collect();

    out.extend(existing.into_iter().filter_map(|(id, change)| match change {
        ExistingChange::Delete => Some(OneOffOp::Delete { id }),
        ExistingChange::Patch(patch) if patch.is_empty() => None,
        ExistingChange::Patch(patch) => Some(OneOffOp::Update { id, patch }),
    }));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use task_model::OneOffTodo;

    fn status(id: EntityId, status: TaskStatus) -> StatusOp {
        StatusOp::new(id, status)
    }

    // ========== Status Queue ==========

    #[test]
    fn test_status_last_write_wins() {
        let ops = vec![
            status(7, TaskStatus::InProgress),
            status(3, TaskStatus::Skipped),
            status(7, TaskStatus::Complete),
        ];
        assert_eq!(
            compress_status_ops(&ops),
            vec![status(7, TaskStatus::Complete), status(3, TaskStatus::Skipped)]
        );
    }

    #[test]
    fn test_status_empty() {
        assert!(compress_status_ops(&[]).is_empty());
    }

    // ========== One-off Queue ==========

    #[test]
    fn test_update_folds_into_pending_create() {
        let ops = vec![
            OneOffOp::create(-1, "Buy milk", None),
            OneOffOp::update(-1, OneOffPatch::title("Buy oat milk")),
        ];
        assert_eq!(
            compress_oneoff_ops(&ops),
            vec![OneOffOp::create(-1, "Buy oat milk", None)]
        );
    }

    #[test]
    fn test_status_folds_into_pending_create() {
        let ops = vec![
            OneOffOp::create(-1, "Buy milk", None),
            OneOffOp::Status {
                id: -1,
                status: TaskStatus::InProgress,
            },
            OneOffOp::update(-1, OneOffPatch::description("2 litres")),
        ];
        assert_eq!(
            compress_oneoff_ops(&ops),
            vec![OneOffOp::Create {
                client_id: -1,
                title: "Buy milk".into(),
                description: Some("2 litres".into()),
                status: Some(TaskStatus::InProgress),
            }]
        );
    }

    #[test]
    fn test_delete_cancels_pending_create() {
        let ops = vec![
            OneOffOp::create(-1, "Buy milk", None),
            OneOffOp::update(-1, OneOffPatch::title("x")),
            OneOffOp::Status {
                id: -1,
                status: TaskStatus::Complete,
            },
            OneOffOp::Delete { id: -1 },
        ];
        assert!(compress_oneoff_ops(&ops).is_empty());
    }

    #[test]
    fn test_ops_after_cancelled_create_are_dropped() {
        let ops = vec![
            OneOffOp::create(-1, "Buy milk", None),
            OneOffOp::Delete { id: -1 },
            OneOffOp::update(-1, OneOffPatch::title("late edit")),
        ];
        assert!(compress_oneoff_ops(&ops).is_empty());
    }

    #[test]
    fn test_delete_wins_for_existing_entity() {
        let ops = vec![
            OneOffOp::update(5, OneOffPatch::title("renamed")),
            OneOffOp::Delete { id: 5 },
            OneOffOp::Status {
                id: 5,
                status: TaskStatus::Complete,
            },
        ];
        assert_eq!(compress_oneoff_ops(&ops), vec![OneOffOp::Delete { id: 5 }]);
    }

    #[test]
    fn test_existing_entity_field_merge() {
        let ops = vec![
            OneOffOp::update(5, OneOffPatch::title("first")),
            OneOffOp::Status {
                id: 5,
                status: TaskStatus::InProgress,
            },
            OneOffOp::update(5, OneOffPatch::description("notes")),
            OneOffOp::update(5, OneOffPatch::title("second")),
        ];
        assert_eq!(
            compress_oneoff_ops(&ops),
            vec![OneOffOp::Update {
                id: 5,
                patch: OneOffPatch {
                    title: Some("second".into()),
                    description: Some("notes".into()),
                    status: Some(TaskStatus::InProgress),
                },
            }]
        );
    }

    #[test]
    fn test_creates_come_before_existing_changes() {
        let ops = vec![
            OneOffOp::Delete { id: 9 },
            OneOffOp::create(-2, "b", None),
            OneOffOp::update(4, OneOffPatch::title("t")),
            OneOffOp::create(-1, "a", None),
        ];
        let out = compress_oneoff_ops(&ops);
        let targets: Vec<_> = out.iter().map(OneOffOp::target_id).collect();
        assert_eq!(targets, vec![-2, -1, 9, 4]);
    }

    #[test]
    fn test_empty_update_is_dropped() {
        let ops = vec![OneOffOp::update(5, OneOffPatch::default())];
        assert!(compress_oneoff_ops(&ops).is_empty());
    }

    // ========== Properties ==========

    fn any_status() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::Incomplete),
            Just(TaskStatus::InProgress),
            Just(TaskStatus::Complete),
            Just(TaskStatus::Skipped),
        ]
    }

    fn any_patch() -> impl Strategy<Value = OneOffPatch> {
        (
            proptest::option::of("[a-c]{1,3}"),
            proptest::option::of("[x-z]{1,3}"),
            proptest::option::of(any_status()),
        )
            .prop_map(|(title, description, status)| OneOffPatch {
                title,
                description,
                status,
            })
    }

    fn any_oneoff_op() -> impl Strategy<Value = OneOffOp> {
        let id = prop_oneof![-3i64..=-1, 1i64..=3];
        prop_oneof![
            ((-3i64..=-1), "[a-c]{1,3}", proptest::option::of("[x-z]{1,3}"))
                .prop_map(|(client_id, title, description)| OneOffOp::create(client_id, title, description)),
            (id.clone(), any_status()).prop_map(|(id, status)| OneOffOp::Status { id, status }),
            (id.clone(), any_patch()).prop_map(|(id, patch)| OneOffOp::Update { id, patch }),
            id.prop_map(|id| OneOffOp::Delete { id }),
        ]
    }

    /// Reference semantics: apply operations one by one to an entity map.
    fn apply(mut state: BTreeMap<EntityId, OneOffTodo>, ops: &[OneOffOp]) -> BTreeMap<EntityId, OneOffTodo> {
        for op in ops {
            match op {
                OneOffOp::Create { .. } => {
                    if let Some(placeholder) = op.placeholder() {
                        state.insert(placeholder.id, placeholder);
                    }
                }
                OneOffOp::Status { id, status } => {
                    if let Some(item) = state.get_mut(id) {
                        item.status = *status;
                    }
                }
                OneOffOp::Update { id, patch } => {
                    if let Some(item) = state.get_mut(id) {
                        patch.apply_to(item);
                    }
                }
                OneOffOp::Delete { id } => {
                    state.remove(id);
                }
            }
        }
        state
    }

    fn base_state() -> BTreeMap<EntityId, OneOffTodo> {
        (1..=3).map(|id| (id, OneOffTodo::new(id, format!("server {id}")))).collect()
    }

    proptest! {
        #[test]
        fn prop_status_single_id_keeps_last(statuses in proptest::collection::vec(any_status(), 1..20)) {
            let ops: Vec<_> = statuses.iter().map(|s| status(7, *s)).collect();
            let out = compress_status_ops(&ops);
            prop_assert_eq!(out, vec![status(7, *statuses.last().unwrap())]);
        }

        #[test]
        fn prop_status_idempotent(ops in proptest::collection::vec((1i64..6, any_status()), 0..30)) {
            let ops: Vec<_> = ops.into_iter().map(|(id, s)| status(id, s)).collect();
            let once = compress_status_ops(&ops);
            prop_assert_eq!(compress_status_ops(&once), once);
        }

        #[test]
        fn prop_oneoff_idempotent(ops in proptest::collection::vec(any_oneoff_op(), 0..30)) {
            let once = compress_oneoff_ops(&ops);
            prop_assert_eq!(compress_oneoff_ops(&once), once);
        }

        #[test]
        fn prop_oneoff_preserves_final_state(ops in proptest::collection::vec(any_oneoff_op(), 0..30)) {
            let compressed = compress_oneoff_ops(&ops);
            prop_assert_eq!(apply(base_state(), &compressed), apply(base_state(), &ops));
        }

        #[test]
        fn prop_oneoff_one_op_per_entity(ops in proptest::collection::vec(any_oneoff_op(), 0..30)) {
            let compressed = compress_oneoff_ops(&ops);
            let mut targets: Vec<_> = compressed.iter().map(OneOffOp::target_id).collect();
            let before = targets.len();
            targets.sort();
            targets.dedup();
            prop_assert_eq!(targets.len(), before);
            prop_assert!(compressed
                .iter()
                .all(|op| !op.targets_pending_entity() || op.is_create()));
        }
    }
}

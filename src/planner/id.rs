//! Task id generation.

/// Produces ids for new tasks. The store re-draws when an id collides with a
/// live task, so implementations only need to be unique in practice.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Random v4 uuids.
#[derive(Debug, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Monotonic decimal ids: "1", "2", ...
#[cfg(test)]
#[derive(Debug)]
pub struct SequentialIds {
    next: u64,
}

#[cfg(test)]
impl SequentialIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }
}

#[cfg(test)]
impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        id.to_string()
    }
}

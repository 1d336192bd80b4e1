use crate::value::{Map, ValueCow};
use crate::Value;

/// The variables visible while rendering.
///
/// Loop variables and lambda parameters are pushed as frames on top of the
/// render context. Lookups search the frames innermost first and then fall
/// back to the context.
#[derive(Debug)]
pub struct Stack<'r, 'a> {
    context: Option<&'a Map<String, Value>>,
    frames: Vec<Vec<(&'r str, ValueCow<'a>)>>,
}

impl<'r, 'a> Stack<'r, 'a> {
    pub fn new(context: Option<&'a Map<String, Value>>) -> Self {
        Self {
            context,
            frames: Vec::new(),
        }
    }

    /// Resolves a variable name.
    pub fn lookup(&self, name: &str) -> Option<ValueCow<'a>> {
        for frame in self.frames.iter().rev() {
            if let Some((_, value)) = frame.iter().rev().find(|(n, _)| *n == name) {
                return Some(value.clone());
            }
        }
        self.context
            .and_then(|context| context.get(name))
            .map(ValueCow::Borrowed)
    }

    /// Whether a variable with the given name is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.iter().any(|(n, _)| *n == name))
            || self.context.map_or(false, |c| c.contains_key(name))
    }

    pub fn push_frame(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Binds a variable in the innermost frame, replacing any previous
    /// binding with the same name in that frame.
    pub fn bind(&mut self, name: &'r str, value: ValueCow<'a>) {
        if self.frames.is_empty() {
            self.frames.push(Vec::new());
        }
        if let Some(frame) = self.frames.last_mut() {
            match frame.iter_mut().find(|(n, _)| *n == name) {
                Some((_, slot)) => *slot = value,
                None => frame.push((name, value)),
            }
        }
    }

    /// The number of open frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Drops frames left open by an interrupted render.
    pub fn truncate(&mut self, len: usize) {
        self.frames.truncate(len);
    }
}

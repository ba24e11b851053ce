//! Event payloads and their type tags.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Any value that can be posted on an [`EventBus`](crate::EventBus).
///
/// Implemented for every `'static` type that is `Send + Sync + Debug`. The
/// `Debug` rendering is the event description used in diagnostics.
pub trait Event: Any + Send + Sync + fmt::Debug {
    /// View the event as [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// The tag of the concrete type behind this value.
    fn event_type(&self) -> EventType;
}

impl<T> Event for T
where
    T: Any + Send + Sync + fmt::Debug,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn event_type(&self) -> EventType {
        EventType::of::<T>()
    }
}

impl dyn Event {
    /// Downcast to the concrete event type.
    #[must_use]
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }

    /// Whether the concrete event type is `E`.
    #[must_use]
    pub fn is<E: Event>(&self) -> bool {
        self.as_any().is::<E>()
    }
}

/// Identity of a concrete event type; the dispatch key.
///
/// Matching is exact: a subscriber registered for one type never receives
/// events of any other type, however the two are related. `i32`, `u8`,
/// `bool`, `Box<i32>` and so on are all distinct tags.
#[derive(Clone, Copy)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
}

impl EventType {
    /// The tag for `E`.
    #[must_use]
    pub fn of<E: Event>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: std::any::type_name::<E>(),
        }
    }

    /// The tag of the concrete type behind a type-erased event.
    ///
    /// Pass the erased value itself (`&*boxed`), not a reference to the
    /// `Box` or `Arc` holding it: those wrappers are events of their own.
    #[must_use]
    pub fn of_dyn(event: &dyn Event) -> Self {
        event.event_type()
    }

    /// The underlying [`TypeId`].
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Readable type name, for diagnostics only.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventType").field(&self.name).finish()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

//! The wire-level `Event` type: an immutable, versioned, partially-populated
//! triple of (recipient?, type?, properties?).

use bytes::Bytes;
use hashbrown::HashMap;

/// Current wire version this crate produces: major 0, minor 1.
pub const CURRENT_VERSION: (u8, u8) = (0, 1);

/// A byte-string keyed/valued property map. Ordering carries no meaning;
/// only set membership does.
pub type Properties = HashMap<Bytes, Bytes>;

/// A single event exchanged between a satellite and the Core.
///
/// Every field is optional except the version tag. `Event` is immutable
/// once constructed; the fluent `with_*` methods consume and return `self`
/// to build one up.
///
/// # Examples
///
/// ```
/// use groundcontrol_core::event::Event;
/// use bytes::Bytes;
///
/// let ev = Event::new()
///     .with_type(Bytes::from_static(b"temp"))
///     .with_property(Bytes::from_static(b"v"), Bytes::from_static(b"23"));
/// assert_eq!(ev.event_type(), Some(&Bytes::from_static(b"temp")[..]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    version: (u8, u8),
    recipient: Option<Bytes>,
    event_type: Option<Bytes>,
    properties: Option<Properties>,
}

impl Event {
    /// Create a new, empty event tagged with the current wire version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: CURRENT_VERSION,
            recipient: None,
            event_type: None,
            properties: None,
        }
    }

    /// Construct an event from already-decoded parts, tagging it with an
    /// explicit version. Used by the codec when decoding.
    #[must_use]
    pub fn from_parts(
        version: (u8, u8),
        recipient: Option<Bytes>,
        event_type: Option<Bytes>,
        properties: Option<Properties>,
    ) -> Self {
        Self {
            version,
            recipient,
            event_type,
            properties,
        }
    }

    #[must_use]
    pub fn with_recipient(mut self, recipient: Bytes) -> Self {
        self.recipient = Some(recipient);
        self
    }

    #[must_use]
    pub fn with_type(mut self, event_type: Bytes) -> Self {
        self.event_type = Some(event_type);
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Add a single property, creating the property map if absent.
    #[must_use]
    pub fn with_property(mut self, key: Bytes, value: Bytes) -> Self {
        self.properties.get_or_insert_with(Properties::new).insert(key, value);
        self
    }

    #[must_use]
    pub const fn version(&self) -> (u8, u8) {
        self.version
    }

    #[must_use]
    pub fn recipient(&self) -> Option<&[u8]> {
        self.recipient.as_deref()
    }

    #[must_use]
    pub fn event_type(&self) -> Option<&[u8]> {
        self.event_type.as_deref()
    }

    #[must_use]
    pub fn properties(&self) -> Option<&Properties> {
        self.properties.as_ref()
    }

    /// Look up a single property by exact (case-sensitive) key match.
    #[must_use]
    pub fn property(&self, key: &[u8]) -> Option<&[u8]> {
        self.properties
            .as_ref()
            .and_then(|p| p.get(key))
            .map(Bytes::as_ref)
    }
}

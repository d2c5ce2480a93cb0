use std::fmt;

/// Protocol steps recorded in a [`SessionTrace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceStep {
    Connection,
    Banner,
    Capabilities,
    Upgrade,
    TlsHandshake,
    CapabilitiesTls,
    EnvelopeSender,
    EnvelopeRecipient,
}

impl TraceStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Banner => "banner",
            Self::Capabilities => "capabilities",
            Self::Upgrade => "upgrade",
            Self::TlsHandshake => "tls_handshake",
            Self::CapabilitiesTls => "capabilities_tls",
            Self::EnvelopeSender => "envelope_sender",
            Self::EnvelopeRecipient => "envelope_recipient",
        }
    }
}

impl fmt::Display for TraceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered step → outcome map. Insertion order is kept; re-recording a step
/// overwrites it in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTrace {
    entries: Vec<(TraceStep, String)>,
}

impl SessionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: TraceStep, outcome: impl Into<String>) {
        let outcome = outcome.into();
        match self.entries.iter_mut().find(|(s, _)| *s == step) {
            Some(entry) => entry.1 = outcome,
            None => self.entries.push((step, outcome)),
        }
    }

    pub fn get(&self, step: TraceStep) -> Option<&str> {
        self.entries
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, outcome)| outcome.as_str())
    }

    pub fn contains(&self, step: TraceStep) -> bool {
        self.get(step).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TraceStep, &str)> {
        self.entries.iter().map(|(s, o)| (*s, o.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(feature = "with-serde")]
impl serde::Serialize for SessionTrace {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (step, outcome) in &self.entries {
            map.serialize_entry(step.as_str(), outcome)?;
        }
        map.end()
    }
}

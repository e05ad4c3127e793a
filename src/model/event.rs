//! Discrete occurrences in time (foot strike, toe off...).

use super::collection::Labelled;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side or scope an event refers to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EventContext {
    Right,
    Left,
    General,
    #[default]
    Unspecified,
    /// Free text not matching a known context
    Other(String),
}

impl EventContext {
    pub fn as_str(&self) -> &str {
        match self {
            EventContext::Right => "Right",
            EventContext::Left => "Left",
            EventContext::General => "General",
            EventContext::Unspecified => "",
            EventContext::Other(s) => s,
        }
    }
}

impl From<&str> for EventContext {
    fn from(s: &str) -> Self {
        match s.trim() {
            "Right" => EventContext::Right,
            "Left" => EventContext::Left,
            "General" => EventContext::General,
            "" => EventContext::Unspecified,
            other => EventContext::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labelled instant of an acquisition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    label: String,
    description: String,
    context: EventContext,
    subject: String,
    /// Seconds from the start of the acquisition
    time: f64,
    /// 1-based frame index, `None` when unknown
    frame: Option<i32>,
    icon_id: i32,
}

impl Event {
    pub fn new(
        label: impl Into<String>,
        time: f64,
        context: impl Into<EventContext>,
        subject: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            context: context.into(),
            subject: subject.into(),
            time,
            frame: None,
            icon_id: 0,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn context(&self) -> &EventContext {
        &self.context
    }

    pub fn set_context(&mut self, context: impl Into<EventContext>) {
        self.context = context.into();
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    pub fn frame(&self) -> Option<i32> {
        self.frame
    }

    pub fn set_frame(&mut self, frame: Option<i32>) {
        self.frame = frame;
    }

    pub fn icon_id(&self) -> i32 {
        self.icon_id
    }

    pub fn set_icon_id(&mut self, icon_id: i32) {
        self.icon_id = icon_id;
    }

    /// Derive the 1-based frame from the time and the point frequency
    pub fn update_frame(&mut self, point_frequency: f64) {
        self.frame = if point_frequency > 0.0 {
            Some((self.time * point_frequency).round() as i32 + 1)
        } else {
            None
        };
    }
}

impl Labelled for Event {
    fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_parsing() {
        assert_eq!(EventContext::from("Right"), EventContext::Right);
        assert_eq!(EventContext::from(""), EventContext::Unspecified);
        assert_eq!(
            EventContext::from("Both"),
            EventContext::Other("Both".to_string())
        );
        assert_eq!(EventContext::from("Both").to_string(), "Both");
    }

    #[test]
    fn test_frame_from_time() {
        let mut evt = Event::new("RIC", 2.72, "Right", "Patient", "");
        evt.update_frame(50.0);
        assert_eq!(evt.frame(), Some(137));
        evt.update_frame(0.0);
        assert_eq!(evt.frame(), None);
    }
}

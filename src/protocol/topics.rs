//! The fixed topic table and placeholder substitution.

use crate::transport::{Error, Topic};

/// A logical operation of the protocol, keyed to one topic template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Service {
    /// Device registration.
    Device,
    /// Commands addressed to the device.
    DeviceInput,
    /// Sensor registration.
    Sensor,
    /// Actuator registration.
    Actuator,
    /// Commands addressed to an actuator.
    ActuatorInput,
    /// Sensor readings.
    SensorOutput,
    /// Device status.
    Status,
}

impl Service {
    /// Every service, in table order.
    pub const ALL: [Service; 7] = [
        Service::Device,
        Service::DeviceInput,
        Service::Sensor,
        Service::Actuator,
        Service::ActuatorInput,
        Service::SensorOutput,
        Service::Status,
    ];

    /// Topic template with `{device}`, `{sensor}` and `{actuator}`
    /// placeholders.
    pub const fn template(self) -> &'static str {
        match self {
            Service::Device => "/devices/{device}",
            Service::DeviceInput => "/devices/{device}/input",
            Service::Sensor => "/devices/{device}/sensors/{sensor}",
            Service::Actuator => "/devices/{device}/actuators/{actuator}",
            Service::ActuatorInput => "/devices/{device}/actuators/{actuator}/input",
            Service::SensorOutput => "/devices/{device}/sensors/{sensor}/output",
            Service::Status => "/devices/{device}/status",
        }
    }

    /// Renders the topic for `device`, with `item` filling the sensor or
    /// actuator placeholder.
    ///
    /// ```rust
    /// use gvcomm::protocol::Service;
    ///
    /// let topic = Service::ActuatorInput.topic("dev1", Some("a1")).unwrap();
    /// assert_eq!(topic, "/devices/dev1/actuators/a1/input");
    /// ```
    pub fn topic(self, device: &str, item: Option<&str>) -> Result<Topic, Error> {
        render(
            self.template(),
            &[("device", Some(device)), ("sensor", item), ("actuator", item)],
        )
    }
}

/// Substitutes `{name}` placeholders in `template` with values from `params`.
///
/// # Errors
///
/// [`Error::InvalidTopic`] when a placeholder has no value, a value is empty
/// or contains `/`, `+` or `#`, the template has an unclosed brace, or the
/// result exceeds [`MAX_TOPIC_LEN`](crate::transport::MAX_TOPIC_LEN).
pub fn render(template: &str, params: &[(&str, Option<&str>)]) -> Result<Topic, Error> {
    let mut topic = Topic::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        topic.push_str(&rest[..open]).map_err(|_| Error::InvalidTopic)?;
        let close = rest[open..].find('}').ok_or(Error::InvalidTopic)? + open;
        let name = &rest[open + 1..close];

        let value = params
            .iter()
            .find(|(key, _)| *key == name)
            .and_then(|(_, value)| *value)
            .ok_or(Error::InvalidTopic)?;
        if !is_valid_segment(value) {
            return Err(Error::InvalidTopic);
        }
        topic.push_str(value).map_err(|_| Error::InvalidTopic)?;

        rest = &rest[close + 1..];
    }
    topic.push_str(rest).map_err(|_| Error::InvalidTopic)?;

    Ok(topic)
}

/// An id is a single, non-wildcard topic level.
fn is_valid_segment(value: &str) -> bool {
    !value.is_empty() && !value.contains(['/', '+', '#'])
}

//! Mapping between the standard parameter groups and the acquisition.
//!
//! Reading fills entity labels, descriptions, units, point types, analog
//! conversions and events from the `POINT`, `ANALOG` and `EVENT` groups.
//! Writing rebuilds `POINT`, `ANALOG`, `EVENT` and `TRIAL` from the live
//! acquisition; other groups are left untouched.

use super::data::AnalogChannel;
use super::header::HeaderEvent;
use crate::error::Result;
use crate::metadata::{
    collapse_child_doubles, collapse_child_values, create_child, create_child_info,
    create_child_values, MetaData, MetaDataInfo, MetaDataValues,
};
use crate::model::{
    Acquisition, AnalogGain, Event, EventContext, PointType, DEFAULT_ANALOG_UNIT,
    DEFAULT_LABEL_PREFIX,
};

/// Point types listed in their own POINT parameter, with their unit parameter
const TYPED_POINT_LISTS: [(PointType, &str, Option<&str>); 6] = [
    (PointType::Angle, "ANGLES", Some("ANGLE_UNITS")),
    (PointType::Force, "FORCES", Some("FORCE_UNITS")),
    (PointType::Moment, "MOMENTS", Some("MOMENT_UNITS")),
    (PointType::Power, "POWERS", Some("POWER_UNITS")),
    (PointType::Scalar, "SCALARS", Some("SCALAR_UNITS")),
    (PointType::Reaction, "REACTIONS", None),
];

const MAX_EVENTS: usize = 255;
const UNSIGNED_FORMAT: &str = "UNSIGNED";

// ── Reading ──

fn first_int(parent: Option<&MetaData>, label: &str) -> Option<i32> {
    parent?.find_child(label)?.info()?.to_int(0).ok()
}

fn first_double(parent: Option<&MetaData>, label: &str) -> Option<f64> {
    parent?.find_child(label)?.info()?.to_double(0).ok()
}

fn first_text(parent: Option<&MetaData>, label: &str) -> Option<String> {
    let text = parent?.find_child(label)?.info()?.to_text(0).ok()?;
    Some(text.trim().to_string())
}

/// Counts above 32767 are stored as negative 16-bit integers
fn as_count(value: i32) -> usize {
    if value < 0 {
        (value + 65536).max(0) as usize
    } else {
        value as usize
    }
}

/// Entity count of `group`: its USED parameter when present, else the header value
pub fn used_count(root: &MetaData, group: &str, header_count: usize) -> usize {
    match first_int(root.find_child(group), "USED").map(as_count) {
        Some(used) if used != header_count => {
            tracing::warn!(
                "{}:USED ({}) differs from the header ({}); the parameter is kept",
                group,
                used,
                header_count
            );
            used
        }
        Some(used) => used,
        None => header_count,
    }
}

/// First and last frame when the header range is saturated.
///
/// Files with more than 65535 frames carry the actual range in
/// TRIAL:ACTUAL_START_FIELD and TRIAL:ACTUAL_END_FIELD as two 16-bit words.
pub fn trial_frame_range(root: &MetaData) -> Option<(u32, u32)> {
    let trial = root.find_child("TRIAL")?;
    let field = |label: &str| -> Option<u32> {
        let words = trial.find_child(label)?.info()?.to_ints().ok()?;
        let low = *words.first()? as u16 as u32;
        let high = words.get(1).map_or(0, |&w| w as u16 as u32);
        Some(low | (high << 16))
    };
    Some((field("ACTUAL_START_FIELD")?, field("ACTUAL_END_FIELD")?))
}

/// Analog conversions from ANALOG:OFFSET, SCALE, GEN_SCALE and FORMAT.
///
/// Returns the per-channel conversions, the general scale and whether
/// samples are unsigned.
pub fn analog_channels(root: &MetaData, analog_number: usize) -> (Vec<AnalogChannel>, f64, bool) {
    let group = root.find_child("ANALOG");
    let unsigned = first_text(group, "FORMAT").is_some_and(|f| f == UNSIGNED_FORMAT);
    let gen_scale = first_double(group, "GEN_SCALE").unwrap_or(1.0);
    let offsets = collapse_child_doubles(group, "OFFSET", Some(analog_number), 0.0);
    let scales = collapse_child_doubles(group, "SCALE", Some(analog_number), 1.0);
    let channels = offsets
        .into_iter()
        .zip(scales)
        .map(|(offset, scale)| {
            let offset = offset as i32;
            AnalogChannel {
                offset: if unsigned { offset as u16 as i32 } else { offset },
                scale,
            }
        })
        .collect();
    (channels, gen_scale, unsigned)
}

/// Labels, descriptions, types and units of the points
pub fn apply_point_metadata(root: &MetaData, acq: &mut Acquisition) {
    let group = root.find_child("POINT");
    let count = acq.point_number();
    let labels = collapse_child_values(group, "LABELS", Some(count), Some(DEFAULT_LABEL_PREFIX));
    let descriptions = collapse_child_values(group, "DESCRIPTIONS", Some(count), None);
    let typed: Vec<(PointType, Vec<String>)> = TYPED_POINT_LISTS
        .iter()
        .map(|(point_type, list, _)| (*point_type, collapse_child_values(group, list, None, None)))
        .filter(|(_, labels)| !labels.is_empty())
        .collect();

    for ((point, label), description) in acq.points_mut().iter_mut().zip(labels).zip(descriptions) {
        let point_type = typed
            .iter()
            .find(|(_, list)| list.contains(&label))
            .map_or(PointType::Marker, |(t, _)| *t);
        point.set_label(label);
        point.set_description(description);
        point.set_point_type(point_type);
    }

    if let Some(unit) = first_text(group, "UNITS") {
        acq.set_point_unit(PointType::Marker, unit);
    }
    for (point_type, _, unit_label) in TYPED_POINT_LISTS {
        if let Some(unit) = unit_label.and_then(|l| first_text(group, l)) {
            acq.set_point_unit(point_type, unit);
        }
    }
}

/// Labels, descriptions, units, gains and conversions of the analog channels
pub fn apply_analog_metadata(root: &MetaData, acq: &mut Acquisition, channels: &[AnalogChannel]) {
    let group = root.find_child("ANALOG");
    let count = acq.analog_number();
    let labels = collapse_child_values(group, "LABELS", Some(count), Some(DEFAULT_LABEL_PREFIX));
    let descriptions = collapse_child_values(group, "DESCRIPTIONS", Some(count), None);
    let units = collapse_child_values(group, "UNITS", Some(count), None);
    let gains = collapse_child_doubles(group, "GAIN", Some(count), 0.0);

    for (idx, analog) in acq.analogs_mut().iter_mut().enumerate() {
        analog.set_label(labels[idx].clone());
        analog.set_description(descriptions[idx].clone());
        if units[idx].is_empty() {
            analog.set_unit(DEFAULT_ANALOG_UNIT);
        } else {
            analog.set_unit(units[idx].clone());
        }
        analog.set_gain(AnalogGain::from_code(gains[idx] as i32));
        if let Some(channel) = channels.get(idx) {
            analog.set_offset(channel.offset);
            analog.set_scale(channel.scale);
        }
    }
}

fn event_group(root: &MetaData) -> Option<&MetaData> {
    root.find_child("EVENT").or_else(|| {
        let group = root.find_child("EVENTS")?;
        tracing::warn!("EVENTS group used instead of EVENT");
        Some(group)
    })
}

/// Events from the EVENT group, or from the header when the group is
/// missing or has no USED parameter.
pub fn extract_events(root: &MetaData, header_events: &[HeaderEvent], point_frequency: f64) -> Vec<Event> {
    let mut events = match event_group(root).filter(|g| g.find_child("USED").is_some()) {
        Some(group) => events_from_group(group),
        None => header_events
            .iter()
            .map(|e| Event::new(e.label.clone(), e.time as f64, EventContext::Unspecified, "", ""))
            .collect(),
    };
    for event in &mut events {
        event.update_frame(point_frequency);
    }
    events
}

fn events_from_group(group: &MetaData) -> Vec<Event> {
    let used = first_int(Some(group), "USED").map_or(0, as_count);
    let labels = collapse_child_values(Some(group), "LABELS", Some(used), Some(DEFAULT_LABEL_PREFIX));
    let contexts = collapse_child_values(Some(group), "CONTEXTS", Some(used), None);
    let subjects = collapse_child_values(Some(group), "SUBJECTS", Some(used), None);
    let descriptions = collapse_child_values(Some(group), "DESCRIPTIONS", Some(used), None);
    let icons = collapse_child_doubles(Some(group), "ICON_IDS", Some(used), 0.0);
    let times = group
        .find_child("TIMES")
        .and_then(|t| t.info())
        .and_then(|i| i.to_doubles().ok())
        .unwrap_or_default();
    if times.len() < 2 * used {
        tracing::warn!(
            "EVENT:TIMES holds {} values for {} events; missing times are set to 0",
            times.len(),
            used
        );
    }

    (0..used)
        .map(|idx| {
            let minutes = times.get(2 * idx).copied().unwrap_or(0.0);
            let seconds = times.get(2 * idx + 1).copied().unwrap_or(0.0);
            let mut event = Event::new(
                labels[idx].clone(),
                minutes * 60.0 + seconds,
                contexts[idx].as_str(),
                subjects[idx].clone(),
                descriptions[idx].clone(),
            );
            event.set_icon_id(icons[idx] as i32);
            event
        })
        .collect()
}

// ── Writing ──

fn count_info(count: usize) -> MetaDataInfo {
    if count > i16::MAX as usize {
        MetaDataInfo::from_i16(count.min(u16::MAX as usize) as u16 as i16)
    } else {
        MetaDataInfo::from_i16(count as i16)
    }
}

fn remove_child_values(parent: &mut MetaData, base: &str) {
    parent.remove_child(base);
    let mut chunk = 2;
    while parent.remove_child(&format!("{}{}", base, chunk)) {
        chunk += 1;
    }
}

fn text_values<I, S>(rows: I) -> MetaDataValues
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    MetaDataValues::Char(rows.into_iter().map(Into::into).collect())
}

/// Rebuild POINT from the points of `acq`; `signed_scale` is the header scale
pub fn write_point_group(root: &mut MetaData, acq: &Acquisition, signed_scale: f32) -> Result<()> {
    let group = create_child(root, "POINT");
    create_child_info(group, "USED", count_info(acq.point_number()));
    let frames = acq.point_frame_number();
    let frames_info = if frames > i16::MAX as usize {
        MetaDataInfo::from_f32(frames as f32)
    } else {
        MetaDataInfo::from_i16(frames as i16)
    };
    create_child_info(group, "FRAMES", frames_info);
    create_child_info(group, "SCALE", MetaDataInfo::from_f32(signed_scale));
    create_child_info(group, "RATE", MetaDataInfo::from_f32(acq.point_frequency() as f32));
    if group.find_child("DATA_START").is_none() {
        create_child_info(group, "DATA_START", MetaDataInfo::from_i16(0));
    }
    create_child_values(group, "LABELS", text_values(acq.points().iter().map(|p| p.label())))?;
    create_child_values(
        group,
        "DESCRIPTIONS",
        text_values(acq.points().iter().map(|p| p.description())),
    )?;
    create_child_info(
        group,
        "UNITS",
        MetaDataInfo::from_text(acq.point_unit(PointType::Marker)),
    );

    for (point_type, list, unit_label) in TYPED_POINT_LISTS {
        let labels: Vec<&str> = acq
            .points()
            .iter()
            .filter(|p| p.point_type() == point_type)
            .map(|p| p.label())
            .collect();
        if labels.is_empty() {
            remove_child_values(group, list);
            if let Some(unit_label) = unit_label {
                group.remove_child(unit_label);
            }
            continue;
        }
        create_child_values(group, list, text_values(labels))?;
        if let Some(unit_label) = unit_label {
            create_child_info(
                group,
                unit_label,
                MetaDataInfo::from_text(acq.point_unit(point_type)),
            );
        }
    }
    Ok(())
}

/// Rebuild ANALOG from the analog channels of `acq` and their conversions
pub fn write_analog_group(
    root: &mut MetaData,
    acq: &Acquisition,
    channels: &[AnalogChannel],
    gen_scale: f64,
) -> Result<()> {
    let group = create_child(root, "ANALOG");
    create_child_info(group, "USED", count_info(acq.analog_number()));
    create_child_info(group, "RATE", MetaDataInfo::from_f32(acq.analog_frequency() as f32));
    create_child_info(group, "GEN_SCALE", MetaDataInfo::from_f32(gen_scale as f32));
    create_child_values(group, "LABELS", text_values(acq.analogs().iter().map(|a| a.label())))?;
    create_child_values(
        group,
        "DESCRIPTIONS",
        text_values(acq.analogs().iter().map(|a| a.description())),
    )?;
    create_child_values(group, "UNITS", text_values(acq.analogs().iter().map(|a| a.unit())))?;
    create_child_values(
        group,
        "SCALE",
        MetaDataValues::Real(channels.iter().map(|c| c.scale as f32).collect()),
    )?;
    create_child_values(
        group,
        "OFFSET",
        MetaDataValues::Integer(channels.iter().map(|c| c.offset as i16).collect()),
    )?;
    create_child_values(
        group,
        "GAIN",
        MetaDataValues::Integer(acq.analogs().iter().map(|a| a.gain().code()).collect()),
    )
}

/// Rebuild EVENT from the events of `acq`; the group is removed when there
/// are none.
pub fn write_event_group(root: &mut MetaData, acq: &Acquisition) -> Result<()> {
    if acq.event_number() == 0 {
        root.remove_child("EVENT");
        return Ok(());
    }
    if acq.event_number() > MAX_EVENTS {
        tracing::warn!(
            "{} events in the acquisition, only the first {} are stored",
            acq.event_number(),
            MAX_EVENTS
        );
    }
    let events: Vec<&Event> = acq.events().iter().take(MAX_EVENTS).collect();
    let group = create_child(root, "EVENT");
    create_child_info(group, "USED", count_info(events.len()));
    create_child_values(group, "LABELS", text_values(events.iter().map(|e| e.label())))?;
    create_child_values(
        group,
        "CONTEXTS",
        text_values(events.iter().map(|e| e.context().as_str())),
    )?;
    create_child_values(group, "SUBJECTS", text_values(events.iter().map(|e| e.subject())))?;
    create_child_values(
        group,
        "DESCRIPTIONS",
        text_values(events.iter().map(|e| e.description())),
    )?;
    let times: Vec<f32> = events
        .iter()
        .flat_map(|e| {
            let minutes = (e.time() / 60.0).floor();
            [minutes as f32, (e.time() - minutes * 60.0) as f32]
        })
        .collect();
    let count = events.len() as u8;
    if let Ok(info) = MetaDataInfo::new(vec![2, count], MetaDataValues::Real(times)) {
        create_child_info(group, "TIMES", info);
    }
    create_child_values(
        group,
        "ICON_IDS",
        MetaDataValues::Integer(events.iter().map(|e| e.icon_id() as i16).collect()),
    )?;
    create_child_values(
        group,
        "GENERIC_FLAGS",
        MetaDataValues::Integer(vec![0; events.len()]),
    )
}

fn frame_words(frame: u32) -> Result<MetaDataInfo> {
    MetaDataInfo::from_i16s(vec![(frame & 0xFFFF) as u16 as i16, (frame >> 16) as u16 as i16])
}

/// Rebuild TRIAL: actual frame range and camera rate
pub fn write_trial_group(root: &mut MetaData, acq: &Acquisition) -> Result<()> {
    let group = create_child(root, "TRIAL");
    let first = acq.first_frame().max(1) as u32;
    let last = acq.last_frame().max(0) as u32;
    create_child_info(group, "ACTUAL_START_FIELD", frame_words(first)?);
    create_child_info(group, "ACTUAL_END_FIELD", frame_words(last)?);
    create_child_info(group, "CAMERA_RATE", MetaDataInfo::from_f32(acq.point_frequency() as f32));
    Ok(())
}

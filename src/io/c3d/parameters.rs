//! C3D parameter section: self-describing group and parameter records.
//!
//! ```text
//! section:  first block (u8) | key (u8) | block count (u8) | processor (u8)
//! record:   label length (i8, < 0 when locked) | id (i8) | label
//!           | next offset (u16, from this field, 0 on the last record)
//! group:    id < 0   description length (u8) | description
//! param:    id > 0   type (i8) | dim count (i8) | dims (u8 each) | values
//!                    | description length (u8) | description
//! ```
//!
//! Parameters belong to the group whose id is the negation of theirs.
//! Malformed records are reported as [`MocapError::ParameterCorruption`],
//! logged, and skipped using their declared offset.

use super::header::{BLOCK_SIZE, HEADER_KEY};
use crate::error::{MocapError, Result};
use crate::io::stream::{BinaryReader, BinaryWriter};
use crate::metadata::{
    element_count, MetaData, MetaDataFormat, MetaDataInfo, MetaDataValues, ROOT_LABEL,
};
use crate::types::ByteOrder;

const MAX_LABEL_LENGTH: usize = 127;
const MAX_DESCRIPTION_LENGTH: usize = 255;
const MAX_PARAMETER_BLOCKS: usize = 255;

/// Decoded parameter section
#[derive(Debug, Clone)]
pub struct ParameterSection {
    /// "ROOT" node holding the groups
    pub root: MetaData,
    /// Block count, as counted while reading
    pub block_number: usize,
    /// First block of the records, relative to the section
    pub first_block: u8,
}

enum Record {
    Group { id: i8, node: MetaData },
    Parameter { group: i8, node: MetaData },
}

fn read_description(r: &mut BinaryReader<'_>) -> Result<String> {
    let len = r.read_u8()? as usize;
    Ok(r.read_string(len)?.trim_end().to_string())
}

fn read_values(
    r: &mut BinaryReader<'_>,
    format: MetaDataFormat,
    dims: &[u8],
) -> Result<MetaDataValues> {
    let count = element_count(format, dims);
    Ok(match format {
        MetaDataFormat::Char => {
            let width = dims.first().copied().unwrap_or(1) as usize;
            let rows = (0..count)
                .map(|_| r.read_string(width))
                .collect::<Result<Vec<_>>>()?;
            MetaDataValues::Char(rows)
        }
        MetaDataFormat::Byte => MetaDataValues::Byte(r.read_i8s(count)?),
        MetaDataFormat::Integer => MetaDataValues::Integer(r.read_i16s(count)?),
        MetaDataFormat::Real => MetaDataValues::Real(r.read_f32s(count)?),
    })
}

fn read_record(r: &mut BinaryReader<'_>, id: i8, label: &str, locked: bool) -> Result<Record> {
    if id < 0 {
        let description = read_description(r)?;
        let node = MetaData::new(label).described(description).locked(locked);
        return Ok(Record::Group { id, node });
    }
    let type_code = r.read_i8()?;
    let format = MetaDataFormat::from_type_code(type_code).ok_or_else(|| {
        MocapError::ParameterCorruption(format!(
            "Parameter '{}' has an unknown data type ({})",
            label, type_code
        ))
    })?;
    let dim_count = r.read_i8()?;
    if dim_count < 0 {
        return Err(MocapError::ParameterCorruption(format!(
            "Parameter '{}' declares {} dimensions",
            label, dim_count
        )));
    }
    let dims = r.read_bytes(dim_count as usize)?;
    let values = read_values(r, format, &dims)?;
    let info = MetaDataInfo::new(dims, values).map_err(|e| {
        MocapError::ParameterCorruption(format!("Parameter '{}': {}", label, e))
    })?;
    let description = read_description(r)?;
    let node = MetaData::with_info(label, info)
        .described(description)
        .locked(locked);
    Ok(Record::Parameter { group: -id, node })
}

/// Decode the parameter section starting at block `parameter_first_block`
pub fn read(r: &mut BinaryReader<'_>, parameter_first_block: u8) -> Result<ParameterSection> {
    let section_start = BLOCK_SIZE as u64 * (parameter_first_block as u64).saturating_sub(1);
    r.seek(section_start);
    let first_block = r.read_u8()?;
    let _key = r.read_u8()?;
    let declared_blocks = r.read_u8()? as usize;
    let _processor = r.read_u8()?;
    if first_block > 1 {
        r.seek(section_start + BLOCK_SIZE as u64 * (first_block as u64 - 1));
    }
    let section_limit = section_start + (declared_blocks * BLOCK_SIZE) as u64;

    let mut groups: Vec<(i8, MetaData)> = Vec::new();
    let mut parameters: Vec<(i8, MetaData)> = Vec::new();
    let consumed_end = loop {
        let label_length = r.read_i8()?;
        if label_length == 0 {
            break r.position();
        }
        let id = r.read_i8()?;
        let label = r.read_string(label_length.unsigned_abs() as usize)?;
        let label = label.trim().to_string();
        let offset_pos = r.position();
        let offset = r.read_u16()?;
        let last = offset == 0;
        let next = offset_pos + offset as u64;

        let record = if id == 0 {
            Err(MocapError::ParameterCorruption(format!(
                "Record '{}' has an id equal to 0",
                label
            )))
        } else {
            read_record(r, id, &label, label_length < 0)
        };
        let record = record.and_then(|rec| {
            if !last && r.position() > next {
                Err(MocapError::ParameterCorruption(format!(
                    "Record '{}' overruns its declared offset by {} bytes",
                    label,
                    r.position() - next
                )))
            } else {
                Ok(rec)
            }
        });
        match record {
            Ok(Record::Group { id, node }) => match groups.iter_mut().find(|(gid, _)| *gid == id) {
                Some(slot) => slot.1 = node,
                None => groups.push((id, node)),
            },
            Ok(Record::Parameter { group, node }) => {
                match parameters
                    .iter_mut()
                    .find(|(gid, p)| *gid == group && p.label() == node.label())
                {
                    Some(slot) => slot.1 = node,
                    None => parameters.push((group, node)),
                }
            }
            Err(e) if !e.is_fatal() => {
                tracing::warn!("{}", e);
            }
            Err(e) => return Err(e),
        }

        if last {
            break r.position();
        }
        if next > section_limit {
            tracing::warn!(
                "The next parameter points into the data section; parameter extraction stopped"
            );
            break r.position();
        }
        r.seek(next);
    };

    let mut root = MetaData::new(ROOT_LABEL);
    for (gid, mut group) in groups {
        let mut idx = 0;
        while idx < parameters.len() {
            if parameters[idx].0 == gid {
                let (_, param) = parameters.remove(idx);
                group.replace_child(param);
            } else {
                idx += 1;
            }
        }
        root.append_child(group);
    }
    if !parameters.is_empty() {
        tracing::warn!(
            "{} parameters have no group with a matching id and are dropped",
            parameters.len()
        );
    }

    let counted = ((consumed_end - section_start) as usize).div_ceil(BLOCK_SIZE);
    if counted != declared_blocks {
        tracing::warn!(
            "Parameter section declares {} blocks but {} were read; keeping the counted value",
            declared_blocks,
            counted
        );
    }

    Ok(ParameterSection {
        root,
        block_number: counted,
        first_block,
    })
}

/// Dimensions as encoded: text rows get their actual width on the first axis
fn encoded_dims(info: &MetaDataInfo) -> Vec<u8> {
    let mut dims = info.dimensions().to_vec();
    if info.format() == MetaDataFormat::Char {
        let width = info.row_width().min(u8::MAX as usize) as u8;
        match dims.first_mut() {
            Some(first) => *first = width,
            None => dims.push(width),
        }
    }
    dims
}

fn write_values(w: &mut BinaryWriter, info: &MetaDataInfo, width: usize) {
    match info.values() {
        MetaDataValues::Char(rows) => rows.iter().for_each(|row| w.write_string(row, width)),
        MetaDataValues::Byte(v) => v.iter().for_each(|&x| w.write_i8(x)),
        MetaDataValues::Integer(v) => v.iter().for_each(|&x| w.write_i16(x)),
        MetaDataValues::Real(v) => v.iter().for_each(|&x| w.write_f32(x)),
    }
}

/// `text` cut to at most `max` bytes on a character boundary
fn truncated(text: &str, max: usize) -> &str {
    let mut end = text.len().min(max);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn write_record_prefix(w: &mut BinaryWriter, node: &MetaData, id: i8, last: bool, content_len: usize) {
    let label = truncated(node.label(), MAX_LABEL_LENGTH);
    let len = label.len() as i8;
    w.write_i8(if node.is_unlocked() { len } else { -len });
    w.write_i8(id);
    w.write_string(label, label.len());
    w.write_u16(if last { 0 } else { (2 + content_len) as u16 });
}

fn write_description(w: &mut BinaryWriter, description: &str) {
    let description = truncated(description, MAX_DESCRIPTION_LENGTH);
    w.write_u8(description.len() as u8);
    w.write_string(description, description.len());
}

/// Encode the groups of `root` as a parameter section starting at the
/// current (block aligned) position. Returns the number of blocks written.
pub fn write(w: &mut BinaryWriter, root: &MetaData, order: ByteOrder) -> Result<usize> {
    let section_start = w.position();
    w.write_u8(1);
    w.write_i8(HEADER_KEY);
    w.write_u8(0);
    w.write_u8(order.processor_code());

    let mut records: Vec<(&MetaData, i8)> = Vec::new();
    for (gidx, group) in root.children().enumerate() {
        if gidx >= i8::MAX as usize {
            return Err(MocapError::Format(format!(
                "Too many parameter groups ({})",
                root.child_number()
            )));
        }
        let gid = gidx as i8 + 1;
        records.push((group, -gid));
        for param in group.children() {
            if param.has_info() {
                records.push((param, gid));
            } else {
                tracing::warn!(
                    "Parameter '{}:{}' has no value and is not written",
                    group.label(),
                    param.label()
                );
            }
        }
    }

    // A zero label length ends the section when read back
    for (node, id) in &records {
        if node.label().trim().is_empty() {
            let message = if *id < 0 {
                "Parameter group with an empty label".to_string()
            } else {
                format!("Parameter with an empty label in group {}", id)
            };
            return Err(MocapError::Format(message));
        }
        if let Some(info) = node.info().filter(|_| *id > 0) {
            if !info.is_consistent() {
                return Err(MocapError::Format(format!(
                    "Parameter '{}' holds {} values but its dimensions {:?} declare {}",
                    node.label(),
                    info.len(),
                    info.dimensions(),
                    element_count(info.format(), info.dimensions())
                )));
            }
        }
    }

    if records.is_empty() {
        w.write_u8(0);
    }
    let count = records.len();
    for (idx, (node, id)) in records.into_iter().enumerate() {
        let last = idx + 1 == count;
        let description = truncated(node.description(), MAX_DESCRIPTION_LENGTH);
        match node.info() {
            Some(info) if id > 0 => {
                let dims = encoded_dims(info);
                let width = match info.format() {
                    MetaDataFormat::Char => dims.first().copied().unwrap_or(0) as usize,
                    _ => 0,
                };
                let data_len = match info.format() {
                    MetaDataFormat::Char => width * info.len(),
                    format => format.element_size() * info.len(),
                };
                let content = 2 + dims.len() + data_len + 1 + description.len();
                if 2 + content > u16::MAX as usize {
                    return Err(MocapError::Format(format!(
                        "Parameter '{}' is too large to be encoded",
                        node.label()
                    )));
                }
                write_record_prefix(w, node, id, last, content);
                w.write_i8(info.format().type_code());
                w.write_i8(dims.len() as i8);
                w.write_bytes(&dims);
                write_values(w, info, width);
                write_description(w, description);
            }
            _ => {
                write_record_prefix(w, node, id, last, 1 + description.len());
                write_description(w, description);
            }
        }
    }

    let blocks = (w.position() - section_start).div_ceil(BLOCK_SIZE);
    if blocks > MAX_PARAMETER_BLOCKS {
        return Err(MocapError::Format(format!(
            "Parameter section needs {} blocks, at most {} are supported",
            blocks, MAX_PARAMETER_BLOCKS
        )));
    }
    w.pad_to(section_start + blocks * BLOCK_SIZE);
    w.patch_u8(section_start + 2, blocks as u8);
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::create_child_info;

    fn sample_root() -> MetaData {
        let mut root = MetaData::new(ROOT_LABEL);
        let mut point = MetaData::new("POINT").described("3-D point parameters");
        point.append_child(MetaData::with_info("USED", MetaDataInfo::from_i16(2)));
        point.append_child(MetaData::with_info("SCALE", MetaDataInfo::from_f32(-0.1)));
        point.append_child(
            MetaData::with_info("LABELS", MetaDataInfo::from_strings(&["RFT1", "LFT10"]).unwrap())
                .described("marker labels"),
        );
        root.append_child(point);
        let mut analog = MetaData::new("ANALOG").locked(true);
        create_child_info(&mut analog, "GEN_SCALE", MetaDataInfo::from_f32(1.0));
        let bits = MetaDataInfo::from_i8s(vec![12, -1]).unwrap();
        analog.append_child(MetaData::with_info("BITS", bits));
        root.append_child(analog);
        root
    }

    fn encode(root: &MetaData, order: ByteOrder) -> Vec<u8> {
        let mut w = BinaryWriter::new(order);
        w.pad_to(BLOCK_SIZE);
        write(&mut w, root, order).unwrap();
        w.into_inner()
    }

    #[test]
    fn test_round_trip_all_orders() {
        let root = sample_root();
        for order in ByteOrder::all() {
            let bytes = encode(&root, order);
            assert_eq!(bytes[BLOCK_SIZE + 3], order.processor_code());
            let mut r = BinaryReader::new(&bytes, order);
            let section = read(&mut r, 2).unwrap();
            assert_eq!(section.root, root, "byte order {}", order);
            assert_eq!(section.block_number, 1);
        }
    }

    #[test]
    fn test_lock_flag_round_trips() {
        let bytes = encode(&sample_root(), ByteOrder::IeeeLittleEndian);
        let section = read(&mut BinaryReader::new(&bytes, ByteOrder::IeeeLittleEndian), 2).unwrap();
        assert!(section.root.find_child("POINT").unwrap().is_unlocked());
        assert!(!section.root.find_child("ANALOG").unwrap().is_unlocked());
    }

    #[test]
    fn test_empty_section() {
        let root = MetaData::new(ROOT_LABEL);
        let bytes = encode(&root, ByteOrder::IeeeLittleEndian);
        assert_eq!(bytes.len(), 2 * BLOCK_SIZE);
        let section = read(&mut BinaryReader::new(&bytes, ByteOrder::IeeeLittleEndian), 2).unwrap();
        assert!(!section.root.has_children());
    }

    /// Hand-built section: group POINT (id -1), a parameter with an unknown
    /// type, then USED.
    fn corrupted_section() -> Vec<u8> {
        let mut w = BinaryWriter::new(ByteOrder::IeeeLittleEndian);
        w.pad_to(BLOCK_SIZE);
        w.write_bytes(&[1, 80, 1, 84]);
        // group
        w.write_i8(5);
        w.write_i8(-1);
        w.write_string("POINT", 5);
        w.write_u16(3);
        w.write_u8(0);
        // parameter with type 7 and a 6-byte payload
        w.write_i8(3);
        w.write_i8(1);
        w.write_string("BAD", 3);
        w.write_u16(2 + 6);
        w.write_bytes(&[7, 0, 0, 0, 0, 0]);
        // USED
        w.write_i8(4);
        w.write_i8(1);
        w.write_string("USED", 4);
        w.write_u16(0);
        w.write_i8(2);
        w.write_i8(0);
        w.write_i16(26);
        w.write_u8(0);
        w.pad_to(2 * BLOCK_SIZE);
        w.into_inner()
    }

    #[test]
    fn test_unknown_type_is_skipped() {
        let bytes = corrupted_section();
        let section = read(&mut BinaryReader::new(&bytes, ByteOrder::IeeeLittleEndian), 2).unwrap();
        let point = section.root.find_child("POINT").unwrap();
        assert!(point.find_child("BAD").is_none());
        assert_eq!(point.find_child("USED").unwrap().info().unwrap().to_int(0).unwrap(), 26);
    }

    #[test]
    fn test_orphan_parameters_are_dropped() {
        let mut w = BinaryWriter::new(ByteOrder::IeeeLittleEndian);
        w.pad_to(BLOCK_SIZE);
        w.write_bytes(&[1, 80, 1, 84]);
        w.write_i8(4);
        w.write_i8(3);
        w.write_string("USED", 4);
        w.write_u16(0);
        w.write_i8(2);
        w.write_i8(0);
        w.write_i16(1);
        w.write_u8(0);
        w.pad_to(2 * BLOCK_SIZE);
        let bytes = w.into_inner();
        let section = read(&mut BinaryReader::new(&bytes, ByteOrder::IeeeLittleEndian), 2).unwrap();
        assert!(!section.root.has_children());
    }

    #[test]
    fn test_repeated_parameter_overwrites() {
        let mut w = BinaryWriter::new(ByteOrder::IeeeLittleEndian);
        w.pad_to(BLOCK_SIZE);
        w.write_bytes(&[1, 80, 1, 84]);
        w.write_i8(5);
        w.write_i8(-1);
        w.write_string("TRIAL", 5);
        w.write_u16(3);
        w.write_u8(0);
        for (value, last) in [(10i16, false), (20i16, true)] {
            w.write_i8(4);
            w.write_i8(1);
            w.write_string("RATE", 4);
            w.write_u16(if last { 0 } else { 7 });
            w.write_i8(2);
            w.write_i8(0);
            w.write_i16(value);
            w.write_u8(0);
        }
        w.pad_to(2 * BLOCK_SIZE);
        let bytes = w.into_inner();
        let section = read(&mut BinaryReader::new(&bytes, ByteOrder::IeeeLittleEndian), 2).unwrap();
        let trial = section.root.find_child("TRIAL").unwrap();
        assert_eq!(trial.child_number(), 1);
        assert_eq!(trial.find_child("RATE").unwrap().info().unwrap().to_int(0).unwrap(), 20);
    }

    #[test]
    fn test_long_values_span_blocks() {
        let mut root = MetaData::new(ROOT_LABEL);
        let mut group = MetaData::new("ANALOG");
        group.append_child(MetaData::with_info(
            "SCALE",
            MetaDataInfo::from_f32s(vec![0.5; 200]).unwrap(),
        ));
        root.append_child(group);
        let bytes = encode(&root, ByteOrder::IeeeBigEndian);
        let mut r = BinaryReader::new(&bytes, ByteOrder::IeeeBigEndian);
        let section = read(&mut r, 2).unwrap();
        assert_eq!(section.block_number, 2);
        assert_eq!(section.root, root);
    }

    #[test]
    fn test_arrays_past_255_values_round_trip() {
        let mut root = MetaData::new(ROOT_LABEL);
        let mut group = MetaData::new("FORCE_PLATFORM");
        group.append_child(MetaData::with_info(
            "CAL_MATRIX",
            MetaDataInfo::from_f32s(vec![1.5; 300]).unwrap(),
        ));
        group.append_child(MetaData::with_info("USED", MetaDataInfo::from_i16(7)));
        root.append_child(group);

        let bytes = encode(&root, ByteOrder::IeeeLittleEndian);
        let section = read(&mut BinaryReader::new(&bytes, ByteOrder::IeeeLittleEndian), 2).unwrap();
        let matrix = section.root.find_path("FORCE_PLATFORM:CAL_MATRIX").unwrap();
        assert_eq!(matrix.info().unwrap().dimensions(), &[150, 2]);
        assert_eq!(matrix.info().unwrap().len(), 300);
        let used = section.root.find_path("FORCE_PLATFORM:USED").unwrap();
        assert_eq!(used.info().unwrap().to_int(0).unwrap(), 7);
    }

    #[test]
    fn test_inconsistent_dimensions_are_rejected() {
        let info: MetaDataInfo = serde_json::from_str(
            r#"{"dims":[2],"values":{"format":"Byte","values":[1,2,3]}}"#,
        )
        .unwrap();
        let mut root = MetaData::new(ROOT_LABEL);
        let mut group = MetaData::new("TRIAL");
        group.append_child(MetaData::with_info("FLAGS", info));
        root.append_child(group);

        let mut w = BinaryWriter::new(ByteOrder::IeeeLittleEndian);
        let err = write(&mut w, &root, ByteOrder::IeeeLittleEndian).unwrap_err();
        assert!(matches!(err, MocapError::Format(_)));
    }

    #[test]
    fn test_empty_labels_are_rejected() {
        let mut root = MetaData::new(ROOT_LABEL);
        let mut group = MetaData::new("POINT");
        group.append_child(MetaData::with_info("", MetaDataInfo::from_i16(1)));
        group.append_child(MetaData::with_info("USED", MetaDataInfo::from_i16(2)));
        root.append_child(group);
        let mut w = BinaryWriter::new(ByteOrder::IeeeLittleEndian);
        assert!(matches!(
            write(&mut w, &root, ByteOrder::IeeeLittleEndian),
            Err(MocapError::Format(_))
        ));

        let mut root = MetaData::new(ROOT_LABEL);
        root.append_child(MetaData::new("  "));
        let mut w = BinaryWriter::new(ByteOrder::IeeeLittleEndian);
        assert!(matches!(
            write(&mut w, &root, ByteOrder::IeeeLittleEndian),
            Err(MocapError::Format(_))
        ));
    }
}

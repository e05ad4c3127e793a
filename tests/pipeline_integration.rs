//! Reader → filter → writer pipelines over real files

mod common;

use common::builders::AcquisitionBuilder;
use common::{assert_float_eq, write_then_read};
use mocap_rs::{
    pipeline::{DataKind, DataObject, PortDescriptor, ProcessCore},
    shared, Acquisition, AcquisitionFileIO, AcquisitionFileReader, AcquisitionFileWriter,
    C3DFileIO, CodecConfig, MocapError, ProcessObject, Result, StorageFormat, WritingFlags,
};
use std::rc::Rc;
use tempfile::TempDir;

static PORTS_IN: [PortDescriptor; 1] = [PortDescriptor::input("acquisition", DataKind::Acquisition)];
static PORTS_OUT: [PortDescriptor; 1] =
    [PortDescriptor::output("acquisition", DataKind::Acquisition)];

/// Keeps the points whose label starts with `prefix`
struct PointSelector {
    core: ProcessCore,
    prefix: String,
    executions: usize,
}

impl PointSelector {
    fn new(prefix: &str) -> Self {
        Self {
            core: ProcessCore::new(&PORTS_IN, &PORTS_OUT),
            prefix: prefix.to_string(),
            executions: 0,
        }
    }

    fn set_prefix(&mut self, prefix: &str) {
        self.prefix = prefix.to_string();
        self.modified();
    }
}

impl ProcessObject for PointSelector {
    fn name(&self) -> &str {
        "PointSelector"
    }

    fn core(&self) -> &ProcessCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ProcessCore {
        &mut self.core
    }

    fn generate_data(
        &mut self,
        inputs: &[Option<Rc<DataObject>>],
        outputs: &mut [DataObject],
    ) -> Result<()> {
        self.executions += 1;
        let input = inputs[0]
            .as_ref()
            .ok_or_else(|| MocapError::Pipeline("PointSelector has no input".to_string()))?;
        let mut acq = input.acquisition()?.clone();
        let kept: Vec<_> = acq
            .points()
            .iter()
            .filter(|p| p.label().starts_with(&self.prefix))
            .cloned()
            .collect();
        acq.points_mut().clear();
        for point in kept {
            acq.append_point(point)?;
        }
        outputs[0] = DataObject::Acquisition(acq);
        Ok(())
    }
}

fn source_file(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("source.c3d");
    let acq = AcquisitionBuilder::new(4, 30)
        .analogs(2, 2)
        .labels(&["LASI", "RASI", "LKNE", "RKNE"])
        .event("LFS", 0.1, "Left")
        .build();
    C3DFileIO::new().write(&path, &acq).unwrap();
    path
}

fn read(path: &std::path::Path) -> Acquisition {
    let mut acq = Acquisition::new();
    C3DFileIO::new().read(path, &mut acq).unwrap();
    acq
}

#[test]
fn test_filtered_copy() {
    let dir = TempDir::new().unwrap();
    let input = source_file(&dir);
    let output = dir.path().join("left.c3d");

    let reader = shared(AcquisitionFileReader::new());
    reader.borrow_mut().set_filename(&input);
    let selector = shared(PointSelector::new("L"));
    selector.borrow_mut().set_nth_input(0, reader.clone(), 0).unwrap();
    let mut writer = AcquisitionFileWriter::new();
    writer.set_input(selector.clone(), 0).unwrap();
    writer.set_filename(&output);
    writer.update().unwrap();

    let copy = read(&output);
    assert_eq!(copy.points().labels(), vec!["LASI", "LKNE"]);
    assert_eq!(copy.analog_number(), 2);
    assert_eq!(copy.event(0).unwrap().label(), "LFS");
}

#[test]
fn test_unchanged_pipeline_runs_once() {
    let dir = TempDir::new().unwrap();
    let input = source_file(&dir);

    let reader = shared(AcquisitionFileReader::new());
    reader.borrow_mut().set_filename(&input);
    let selector = shared(PointSelector::new("R"));
    selector.borrow_mut().set_nth_input(0, reader.clone(), 0).unwrap();
    let mut writer = AcquisitionFileWriter::new();
    writer.set_input(selector.clone(), 0).unwrap();
    writer.set_filename(dir.path().join("right.c3d"));

    writer.update().unwrap();
    // The source is only read on the first pass
    std::fs::remove_file(&input).unwrap();
    writer.update().unwrap();
    assert_eq!(selector.borrow().executions, 1);

    selector.borrow_mut().set_prefix("RK");
    writer.update().unwrap();
    assert_eq!(selector.borrow().executions, 2);
    assert_eq!(read(&dir.path().join("right.c3d")).points().labels(), vec!["RKNE"]);
}

#[test]
fn test_shared_reader_feeds_two_writers() {
    let dir = TempDir::new().unwrap();
    let input = source_file(&dir);

    let reader = shared(AcquisitionFileReader::new());
    reader.borrow_mut().set_filename(&input);
    let left = shared(PointSelector::new("L"));
    left.borrow_mut().set_nth_input(0, reader.clone(), 0).unwrap();
    let right = shared(PointSelector::new("R"));
    right.borrow_mut().set_nth_input(0, reader.clone(), 0).unwrap();

    let mut left_writer = AcquisitionFileWriter::new();
    left_writer.set_input(left.clone(), 0).unwrap();
    left_writer.set_filename(dir.path().join("left.c3d"));
    let mut right_writer = AcquisitionFileWriter::new();
    right_writer.set_input(right.clone(), 0).unwrap();
    right_writer.set_filename(dir.path().join("right.c3d"));

    left_writer.update().unwrap();
    // Already read: the second branch does not touch the file again
    std::fs::remove_file(&input).unwrap();
    right_writer.update().unwrap();

    assert_eq!(read(&dir.path().join("right.c3d")).points().labels(), vec!["RASI", "RKNE"]);
}

#[test]
fn test_new_filename_reads_again() {
    let dir = TempDir::new().unwrap();
    let first = source_file(&dir);
    let second = dir.path().join("second.c3d");
    C3DFileIO::new()
        .write(&second, &AcquisitionBuilder::new(1, 5).frequency(250.0).build())
        .unwrap();

    let mut reader = AcquisitionFileReader::new();
    reader.set_filename(&first);
    assert_eq!(reader.output().unwrap().acquisition().unwrap().point_number(), 4);
    reader.set_filename(&second);
    let output = reader.output().unwrap();
    assert_eq!(output.acquisition().unwrap().point_number(), 1);
    assert_eq!(output.acquisition().unwrap().point_frequency(), 250.0);
}

#[test]
fn test_format_error_reaches_the_writer_caller() {
    let dir = TempDir::new().unwrap();
    let input = source_file(&dir);
    let mut bytes = std::fs::read(&input).unwrap();
    // processor type of the parameter section
    bytes[512 + 3] = 0;
    std::fs::write(&input, &bytes).unwrap();
    let output = dir.path().join("never.c3d");

    let reader = shared(AcquisitionFileReader::new());
    reader.borrow_mut().set_filename(&input);
    let mut writer = AcquisitionFileWriter::new();
    writer.set_input(reader.clone(), 0).unwrap();
    writer.set_filename(&output);

    let err = writer.update().unwrap_err();
    assert!(matches!(err, MocapError::Format(ref m) if m == "Invalid processor type"));
    assert!(!output.exists());
}

#[test]
fn test_missing_file_reaches_the_caller() {
    let dir = TempDir::new().unwrap();
    let mut reader = AcquisitionFileReader::new();
    reader.set_filename(dir.path().join("absent.c3d"));
    match reader.update() {
        Err(MocapError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_corrupted_parameter_is_skipped() {
    let dir = TempDir::new().unwrap();
    let input = source_file(&dir);
    let mut bytes = std::fs::read(&input).unwrap();
    let label = b"GEN_SCALE";
    let pos = bytes
        .windows(label.len())
        .position(|w| w == label)
        .unwrap();
    // type byte after the label and the 2-byte offset
    bytes[pos + label.len() + 2] = 9;
    std::fs::write(&input, &bytes).unwrap();

    let mut reader = AcquisitionFileReader::new();
    reader.set_filename(&input);
    let output = reader.output().unwrap();
    let acq = output.acquisition().unwrap();
    assert!(acq.metadata().find_path("ANALOG:GEN_SCALE").is_none());
    assert!(acq.metadata().find_path("ANALOG:SCALE").is_some());
    assert_eq!(acq.analog_number(), 2);
    assert_float_eq(
        acq.analog(1).unwrap().values()[3],
        common::builders::analog_value(1, 3),
        acq.analog(1).unwrap().scale(),
    );
}

#[test]
fn test_configured_codec_converts() {
    let dir = TempDir::new().unwrap();
    let input = source_file(&dir);
    let output = dir.path().join("float_be.c3d");

    let config = CodecConfig {
        data_format: StorageFormat::Float,
        byte_order: mocap_rs::ByteOrder::IeeeBigEndian,
        writing_flags: WritingFlags::ALL,
    };
    let mut codec = C3DFileIO::new();
    config.apply(&mut codec);

    let reader = shared(AcquisitionFileReader::new());
    reader.borrow_mut().set_filename(&input);
    let mut writer = AcquisitionFileWriter::new();
    writer.set_input(reader.clone(), 0).unwrap();
    writer.set_acquisition_io(Some(Rc::new(std::cell::RefCell::new(codec))));
    writer.set_filename(&output);
    writer.update().unwrap();

    let mut io = C3DFileIO::new();
    let mut converted = Acquisition::new();
    io.read(&output, &mut converted).unwrap();
    assert_eq!(io.byte_order(), mocap_rs::ByteOrder::IeeeBigEndian);
    assert_eq!(io.storage_format(), StorageFormat::Float);

    let original = write_then_read(&dir.path().join("reference.c3d"), &read(&input));
    assert_eq!(converted.points().labels(), original.points().labels());
    for (a, b) in converted.points().iter().zip(original.points().iter()) {
        for f in (0..a.frame_number()).filter(|&f| a.is_valid(f)) {
            assert!(b.is_valid(f));
            for axis in 0..3 {
                assert_float_eq(a.values()[f][axis], b.values()[f][axis], 0.02);
            }
        }
    }
}

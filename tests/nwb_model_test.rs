//! NWB container model tests
//!
//! Link resolution and name uniqueness of the container graph, independent
//! of the exporter.

use chrono::{TimeZone, Utc};
use ophys_nwb_export::nwb::{
    CorrectedImageStack, Dataset, Device, Fluorescence, ImageSegmentation, ImageSeries,
    ImagingPlane, JsonNwbWriter, MotionCorrection, NwbFile, NwbWriter, OpticalChannel,
    PixelMaskPoint, PlaneSegmentation, ProcessingModule, RoiResponseSeries, TimeSeries,
    TwoPhotonSeries,
};
use ophys_nwb_export::Error;

fn base_file() -> NwbFile {
    let start = Utc.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap();
    let mut file = NwbFile::builder("session", "Imaging session", start)
        .institution("Lab")
        .build();
    file.create_device(Device {
        name: "scope".to_string(),
        description: String::new(),
        manufacturer: String::new(),
    })
    .unwrap();
    file.create_imaging_plane(ImagingPlane {
        name: "ImagingPlane_0".to_string(),
        description: String::new(),
        optical_channel: OpticalChannel {
            name: "OpticalChannel".to_string(),
            description: "an optical channel".to_string(),
            emission_lambda: 500.0,
        },
        imaging_rate: 30.0,
        device: "scope".to_string(),
        excitation_lambda: 600.0,
        indicator: "GFP".to_string(),
        location: String::new(),
        grid_spacing: vec![],
        grid_spacing_unit: String::new(),
        origin_coords: vec![],
        origin_coords_unit: String::new(),
    })
    .unwrap();
    file.add_acquisition(series("TwoPhotonSeries2_0", "ImagingPlane_0"))
        .unwrap();
    file
}

fn series(name: &str, plane: &str) -> TwoPhotonSeries {
    TwoPhotonSeries {
        name: name.to_string(),
        imaging_plane: plane.to_string(),
        external_file: vec!["stack.tif".into()],
        starting_frame: vec![0],
        format: "external".to_string(),
        dimension: vec![100, 100],
        starting_time: 0.0,
        rate: 1.0,
    }
}

fn stack(original: &str) -> CorrectedImageStack {
    CorrectedImageStack {
        name: original.to_string(),
        corrected: ImageSeries {
            name: "corrected".to_string(),
            data: Dataset::ones(vec![2, 2, 2]),
            unit: "na".to_string(),
            format: String::new(),
            starting_time: 0.0,
            rate: 1.0,
        },
        original: original.to_string(),
        xy_translation: TimeSeries {
            name: "xy_translation".to_string(),
            data: Dataset::ones(vec![4, 2]),
            unit: "pixels".to_string(),
            starting_time: 0.0,
            rate: 1.0,
        },
    }
}

fn segmentation(rois: usize) -> PlaneSegmentation {
    let mut ps = PlaneSegmentation::new(
        "PlaneSegmentation_0",
        "output from segmenting the imaging plane",
        "ImagingPlane_0",
        Some("TwoPhotonSeries2_0".to_string()),
    );
    for i in 0..rois {
        let x = u32::try_from(i).unwrap();
        ps.add_roi(
            [PixelMaskPoint {
                x,
                y: x,
                weight: 0.01,
            }]
            .into_iter()
            .collect(),
        );
    }
    ps
}

#[test]
fn test_acquisition_requires_plane() {
    let mut file = base_file();
    let result = file.add_acquisition(series("TwoPhotonSeries2_9", "ImagingPlane_9"));
    assert!(matches!(
        result,
        Err(Error::UnknownReference {
            kind: "imaging plane",
            ..
        })
    ));
}

#[test]
fn test_duplicate_acquisition_name() {
    let mut file = base_file();
    let result = file.add_acquisition(series("TwoPhotonSeries2_0", "ImagingPlane_0"));
    assert!(matches!(result, Err(Error::DuplicateName { .. })));
}

#[test]
fn test_motion_correction_requires_original_series() {
    let mut file = base_file();
    let mut mc = MotionCorrection::new();
    mc.add_corrected_image_stack(stack("TwoPhotonSeries2_7")).unwrap();
    let mut module = ProcessingModule::new("ophys", "desc");
    module.add(mc).unwrap();

    let result = file.add_processing_module(module);
    assert!(matches!(
        result,
        Err(Error::UnknownReference {
            kind: "acquisition series",
            ..
        })
    ));
    assert!(file.processing().is_empty());
}

#[test]
fn test_duplicate_corrected_stack() {
    let mut mc = MotionCorrection::new();
    mc.add_corrected_image_stack(stack("TwoPhotonSeries2_0")).unwrap();
    assert!(mc.add_corrected_image_stack(stack("TwoPhotonSeries2_0")).is_err());
}

#[test]
fn test_fluorescence_region_resolves_against_segmentation() {
    let mut file = base_file();
    let ps = segmentation(3);
    let region = ps.create_roi_table_region(vec![0, 1, 2], "list of ROIs").unwrap();

    let mut seg = ImageSegmentation::new();
    seg.add_plane_segmentation(ps).unwrap();
    let mut fl = Fluorescence::new();
    fl.add_roi_response_series(RoiResponseSeries {
        name: "RawfluorescenceResponseSeries_0".to_string(),
        description: "Raw fluorescence trace".to_string(),
        unit: "a.u.".to_string(),
        data: Dataset::try_dense(vec![3, 1], vec![0.1, 0.2, 0.3]).unwrap(),
        timestamps: Dataset::try_dense(vec![3, 1], vec![0.0, 0.0, 0.0]).unwrap(),
        rois: region,
    })
    .unwrap();

    let mut module = ProcessingModule::new("ophys", "desc");
    module.add(seg).unwrap();
    module.add(fl).unwrap();
    file.add_processing_module(module).unwrap();

    assert_eq!(
        file.processing_module("ophys")
            .and_then(ProcessingModule::fluorescence)
            .map(|f| f.roi_response_series().len()),
        Some(1)
    );
}

#[test]
fn test_fluorescence_without_segmentation_rejected() {
    let mut file = base_file();
    let region = segmentation(2)
        .create_roi_table_region(vec![0], "list of ROIs")
        .unwrap();
    let mut fl = Fluorescence::new();
    fl.add_roi_response_series(RoiResponseSeries {
        name: "r".to_string(),
        description: String::new(),
        unit: "a.u.".to_string(),
        data: Dataset::ones(vec![1, 1]),
        timestamps: Dataset::ones(vec![1, 1]),
        rois: region,
    })
    .unwrap();
    let mut module = ProcessingModule::new("ophys", "desc");
    module.add(fl).unwrap();

    assert!(matches!(
        file.add_processing_module(module),
        Err(Error::UnknownReference {
            kind: "plane segmentation",
            ..
        })
    ));
}

#[test]
fn test_segmentation_requires_plane() {
    let mut file = base_file();
    let mut seg = ImageSegmentation::new();
    seg.add_plane_segmentation(PlaneSegmentation::new("ps", "", "ImagingPlane_5", None))
        .unwrap();
    let mut module = ProcessingModule::new("ophys", "desc");
    module.add(seg).unwrap();

    assert!(file.add_processing_module(module).is_err());
}

#[test]
fn test_duplicate_processing_module() {
    let mut file = base_file();
    file.add_processing_module(ProcessingModule::new("ophys", "a"))
        .unwrap();
    assert!(matches!(
        file.add_processing_module(ProcessingModule::new("ophys", "b")),
        Err(Error::DuplicateName { .. })
    ));
}

#[test]
fn test_json_document_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layout.nwb");
    let mut file = base_file();
    let mut mc = MotionCorrection::new();
    mc.add_corrected_image_stack(stack("TwoPhotonSeries2_0")).unwrap();
    let mut module = ProcessingModule::new("ophys", "optical physiology processed data");
    module.add(mc).unwrap();
    file.add_processing_module(module).unwrap();

    JsonNwbWriter::new().pretty(true).write(&file, &path).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["nwb_version"], "2.5.0");
    assert_eq!(value["root"]["identifier"], "session");
    let interface = &value["root"]["processing"][0]["interfaces"][0];
    assert_eq!(interface["neurodata_type"], "MotionCorrection");
    let corrected = &interface["corrected_image_stacks"][0]["corrected"]["data"];
    assert_eq!(corrected["storage"], "fill");
    assert_eq!(corrected["shape"], serde_json::json!([2, 2, 2]));
}

//! Property-based tests for ophys-nwb-export
//!
//! - Naming invariants for arbitrary session keys and records
//! - Dataset transpose invariants
//! - Placeholder bounds
//! - Run with ProptestConfig::with_cases(100)

use chrono::NaiveDate;
use proptest::prelude::*;

use ophys_nwb_export::config::{ExportConfig, PlaceholderDims};
use ophys_nwb_export::export::{SessionExporter, OPHYS_MODULE};
use ophys_nwb_export::nwb::Dataset;
use ophys_nwb_export::placeholder::{PixelMaskSpec, PlaceholderSource, RandomPlaceholders};
use ophys_nwb_export::scan::StaticScan;
use ophys_nwb_export::session::{PlaneKey, SampleSessionSource, SessionCatalog, SessionRecord, SessionSource, SubjectRecord};

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (1990i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn arb_matrix() -> impl Strategy<Value = Dataset> {
    (1usize..8, 1usize..8).prop_flat_map(|(rows, cols)| {
        proptest::collection::vec(-1.0e6f64..1.0e6, rows * cols)
            .prop_map(move |values| Dataset::try_dense(vec![rows, cols], values).unwrap())
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: subject ID is `<animal_id>-<datasource_id>-<session_key>` for any key
    #[test]
    fn prop_subject_id_format(key in ".*") {
        let exporter = SessionExporter::builder(ExportConfig::default()).build().unwrap();
        let subject = exporter.build_subject(&key).unwrap();
        prop_assert_eq!(subject.subject_id, format!("abc123-0-{key}"));
    }

    /// Property: file name is the underscore join of name, date and timeseries
    #[test]
    fn prop_file_name_format(
        name in "[a-z0-9]{1,12}",
        series in "[A-Za-z0-9_-]{1,24}",
        date in arb_date(),
        hour in 0u32..24,
    ) {
        let timestamp = date.and_hms_opt(hour, 0, 0).unwrap();
        let record = SessionRecord::builder(name.clone(), timestamp, series.clone()).build();
        prop_assert_eq!(
            record.nwb_file_name(),
            format!("{}_{}_{}.nwb", name, date.format("%Y-%m-%d"), series)
        );
    }

    /// Property: transposing twice is the identity
    #[test]
    fn prop_transpose_involution(matrix in arb_matrix()) {
        let twice = matrix.clone().transposed().unwrap().transposed().unwrap();
        prop_assert_eq!(twice, matrix);
    }

    /// Property: transpose swaps indices
    #[test]
    fn prop_transpose_swaps_index(matrix in arb_matrix()) {
        let t = matrix.clone().transposed().unwrap();
        let (rows, cols) = (matrix.shape()[0], matrix.shape()[1]);
        for r in 0..rows {
            for c in 0..cols {
                prop_assert_eq!(matrix.get(&[r, c]), t.get(&[c, r]));
            }
        }
    }

    /// Property: generated masks stay inside the configured ranges
    #[test]
    fn prop_pixel_mask_bounds(seed in any::<u64>(), points in 1usize..64) {
        let spec = PixelMaskSpec { points, ..PixelMaskSpec::default() };
        let mask = RandomPlaceholders::seeded(seed).pixel_mask(&spec);
        prop_assert_eq!(mask.len(), points);
        for p in mask.iter() {
            prop_assert!(spec.x.contains(&p.x));
            prop_assert!(spec.y.contains(&p.y));
            prop_assert!(spec.weight.contains(&p.weight));
        }
    }

    /// Property: one imaging plane per plane key when reader count matches,
    /// MetadataMismatch otherwise
    #[test]
    fn prop_plane_count_matches_keys(planes in 0usize..5, readers in 0usize..5) {
        let sample = SampleSessionSource::new();
        let keys: Vec<PlaneKey> = (0..planes)
            .map(|i| PlaneKey {
                session_name: "s".to_string(),
                recording_order: 0,
                recording_name: "r".to_string(),
                dataset_name: "d".to_string(),
                center_plane: u32::try_from(i).unwrap(),
            })
            .collect();
        let mut catalog = SessionCatalog::new();
        catalog.insert("k", sample.session("k").unwrap(), SubjectRecord::builder("a", 1).build(), keys);

        let config = ExportConfig::builder()
            .placeholders(PlaceholderDims::small())
            .build()
            .unwrap();
        let mut builder = SessionExporter::builder(config).source(catalog);
        for _ in 0..readers {
            builder = builder.reader(StaticScan::new("s.tif", 1, 10.0));
        }
        let mut exporter = builder.build().unwrap();

        let dir = tempfile::tempdir().unwrap();
        match exporter.export_session("k", dir.path(), true) {
            Ok(report) => {
                prop_assert_eq!(planes, readers);
                let file = report.file();
                prop_assert_eq!(file.imaging_planes().len(), planes);
                prop_assert_eq!(file.acquisition().len(), planes);
                let mc = file.processing_module(OPHYS_MODULE).unwrap().motion_correction().unwrap();
                prop_assert_eq!(mc.corrected_image_stacks().len(), planes);
            }
            Err(ophys_nwb_export::Error::MetadataMismatch { planes: p, readers: r }) => {
                prop_assert_ne!(planes, readers);
                prop_assert_eq!((p, r), (planes, readers));
                prop_assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
            }
            Err(e) => prop_assert!(false, "unexpected error: {}", e),
        }
    }
}

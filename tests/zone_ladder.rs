//! Zone ladder scenarios on a 1024-cluster volume
//!
//! Zones: [128, 1024), [64, 128), [32, 64), [0, 32)

use ntfs_cluster_alloc::{AllocError, ClusterAllocator, ClusterRange, MemoryBitmap, VolumeGeometry};

const TOTAL: u64 = 1024;

fn empty_volume() -> ClusterAllocator<MemoryBitmap> {
    let geometry = VolumeGeometry::new(TOTAL * 512, 512).unwrap();
    ClusterAllocator::with_geometry(MemoryBitmap::new(TOTAL), &geometry).unwrap()
}

fn range(start: u64, length: u64) -> ClusterRange {
    ClusterRange::new(start, length).unwrap()
}

#[test]
fn test_free_volume_gives_one_contiguous_run_in_upper_zone() {
    let mut alloc = empty_volume();

    let runs = alloc.allocate(10, None, false, 10).unwrap();

    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].length(), 10);
    assert!(runs[0].start() >= 128 && runs[0].end() <= 1024);
}

#[test]
fn test_full_upper_zone_falls_to_second_zone() {
    let mut alloc = empty_volume();
    alloc.mark_allocated(range(128, 896)).unwrap();

    let runs = alloc.allocate(5, None, false, 5).unwrap();
    assert_eq!(runs, vec![range(64, 5)]);
}

#[test]
fn test_full_upper_zones_fall_to_third_zone() {
    let mut alloc = empty_volume();
    alloc.mark_allocated(range(64, 960)).unwrap();

    let runs = alloc.allocate(5, None, false, 5).unwrap();
    assert_eq!(runs, vec![range(32, 5)]);
}

#[test]
fn test_low_zone_is_last_resort() {
    let mut alloc = empty_volume();
    alloc.mark_allocated(range(32, 992)).unwrap();

    let runs = alloc.allocate(5, None, false, 5).unwrap();
    assert_eq!(runs, vec![range(0, 5)]);
}

#[test]
fn test_short_zone_spills_into_next() {
    let mut alloc = empty_volume();
    alloc.mark_allocated(range(67, 957)).unwrap();

    // Only [64, 67) is free above cluster 64
    let runs = alloc.allocate(5, None, false, 5).unwrap();
    assert_eq!(runs, vec![range(64, 3), range(32, 2)]);
}

#[test]
fn test_fragmented_upper_zone_accepts_scattered_runs() {
    let mut alloc = empty_volume();
    alloc.mark_allocated(range(128, 896)).unwrap();
    alloc
        .free(&[range(300, 2), range(600, 2), range(900, 2)])
        .unwrap();

    // No single 6-cluster run exists, the non-contiguous pass collects all three
    let runs = alloc.allocate(6, None, false, 6).unwrap();
    let mut starts: Vec<u64> = runs.iter().map(|r| r.start()).collect();
    starts.sort_unstable();
    assert_eq!(starts, vec![300, 600, 900]);
    assert!(runs.iter().all(|r| r.length() == 2));
}

#[test]
fn test_nine_free_clusters_cannot_satisfy_ten() {
    let mut alloc = empty_volume();
    alloc.mark_allocated(range(0, TOTAL)).unwrap();
    alloc
        .free(&[
            range(5, 1),
            range(40, 2),
            range(100, 1),
            range(500, 3),
            range(1023, 1),
            range(700, 1),
        ])
        .unwrap();
    assert_eq!(alloc.free_clusters(), 9);

    let before = alloc.bitmap().to_bytes();
    let result = alloc.allocate(10, None, false, 10);

    assert!(matches!(
        result,
        Err(AllocError::OutOfSpace {
            requested: 10,
            found: 9
        })
    ));
    assert_eq!(alloc.bitmap().to_bytes(), before);
    assert_eq!(alloc.free_clusters(), 9);
}

#[test]
fn test_nine_free_clusters_satisfy_nine() {
    let mut alloc = empty_volume();
    alloc.mark_allocated(range(0, TOTAL)).unwrap();
    alloc
        .free(&[range(5, 4), range(40, 2), range(500, 3)])
        .unwrap();

    let runs = alloc.allocate(9, None, false, 9).unwrap();
    assert_eq!(runs, vec![range(500, 3), range(40, 2), range(5, 4)]);
    assert_eq!(alloc.free_clusters(), 0);
}

#[test]
fn test_successive_data_allocations_increase() {
    let mut alloc = empty_volume();

    let mut last = None;
    for _ in 0..20 {
        let runs = alloc.allocate(1, None, false, 1).unwrap();
        let start = runs[0].start();
        if let Some(previous) = last {
            assert!(start > previous, "cursor reset: {} after {}", start, previous);
        }
        last = Some(start);
    }
}

#[test]
fn test_cursor_wraps_round_robin() {
    let mut alloc = empty_volume();

    // Walk the cursor to the end of the upper zone
    let big = alloc.allocate(890, None, false, 890).unwrap();
    assert_eq!(big, vec![range(128, 890)]);
    alloc.free(&big).unwrap();

    // 890 / 4 headroom pushes the cursor past the zone, so the scan restarts
    let runs = alloc.allocate(4, None, false, 4).unwrap();
    assert_eq!(runs, vec![range(128, 4)]);
}

#[test]
fn test_metadata_grows_from_volume_start() {
    let mut alloc = empty_volume();
    alloc.mark_allocated(range(0, 16)).unwrap();

    let first = alloc.allocate(8, None, true, 0).unwrap();
    assert_eq!(first, vec![range(16, 8)]);

    // Growing the table extends its last run
    let second = alloc.allocate(8, Some(24), true, 0).unwrap();
    assert_eq!(second, vec![range(24, 8)]);

    // Data allocations leave the low clusters alone
    let data = alloc.allocate(8, None, false, 8).unwrap();
    assert!(data[0].start() >= 128);
}

#[test]
fn test_metadata_ignores_and_keeps_data_cursor() {
    let mut alloc = empty_volume();
    alloc.allocate(1, None, false, 1).unwrap();
    let cursor = alloc.scan_cursor();

    alloc.allocate(4, None, true, 0).unwrap();
    assert_eq!(alloc.scan_cursor(), cursor);
}

#[test]
fn test_invalid_requests_fail_fast() {
    let mut alloc = empty_volume();

    assert!(matches!(
        alloc.allocate(0, None, false, 0),
        Err(AllocError::InvalidCount)
    ));
    assert!(matches!(
        alloc.allocate(1, Some(TOTAL), true, 0),
        Err(AllocError::InvalidRange { .. })
    ));
    assert!(matches!(
        alloc.free(&[range(TOTAL - 1, 2)]),
        Err(AllocError::InvalidRange { .. })
    ));
    assert!(matches!(
        alloc.mark_allocated(range(TOTAL, 1)),
        Err(AllocError::InvalidRange { .. })
    ));
    assert_eq!(alloc.used_clusters(), 0);
}

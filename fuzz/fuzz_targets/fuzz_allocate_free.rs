#![no_main]
use libfuzzer_sys::{fuzz_target, arbitrary::{Arbitrary, Unstructured}};
use ntfs_cluster_alloc::{total_length, ClusterAllocator, ClusterBitmap, ClusterRange, MemoryBitmap};

#[derive(Debug, Arbitrary)]
enum Op {
    Allocate { count: u16, hint: Option<u16>, is_metadata: bool, size_after: u16 },
    Free { index: u8 },
    Reserve { start: u16, length: u8 },
}

// Random allocate/free sequences must never double-allocate or leak clusters
fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);

    let total: u16 = match u.arbitrary() {
        Ok(total) => total,
        Err(_) => return,
    };
    let total = total as u64 + 1;

    let ops: Vec<Op> = match u.arbitrary() {
        Ok(ops) => ops,
        Err(_) => return,
    };

    let mut alloc = match ClusterAllocator::new(MemoryBitmap::new(total), total) {
        Ok(alloc) => alloc,
        Err(_) => return,
    };
    let mut live: Vec<Vec<ClusterRange>> = Vec::new();
    let mut owned = 0u64;

    for op in ops.into_iter().take(64) {
        match op {
            Op::Allocate { count, hint, is_metadata, size_after } => {
                let before = alloc.bitmap().clone();
                let hint = hint.map(|h| h as u64 % total);
                match alloc.allocate(count as u64, hint, is_metadata, size_after as u64) {
                    Ok(runs) => {
                        assert_eq!(total_length(&runs), count as u64);
                        for run in &runs {
                            for cluster in run.start()..run.end() {
                                assert!(!before.is_used(cluster));
                            }
                        }
                        owned += count as u64;
                        live.push(runs);
                    }
                    Err(_) => assert_eq!(alloc.bitmap(), &before),
                }
            }
            Op::Free { index } => {
                if live.is_empty() {
                    continue;
                }
                let runs = live.swap_remove(index as usize % live.len());
                owned -= total_length(&runs);
                alloc.free(&runs).unwrap();
            }
            Op::Reserve { start, length } => {
                // Reserving outside the volume must be rejected without side effects
                let start = start as u64 + total;
                if let Ok(run) = ClusterRange::new(start, length as u64 + 1) {
                    assert!(alloc.mark_allocated(run).is_err());
                }
            }
        }

        assert_eq!(alloc.used_clusters(), owned);
    }
});

//! Several drivers sharing one region from different threads

mod common;

use common::{HostedRegion, Rng};
use dma_pool::DmaError;
use std::thread;

#[test]
fn test_threads_share_one_region() {
    const THREADS: u64 = 4;
    const ROUNDS: usize = 500;

    let region = HostedRegion::new(0x2000_0000, 0x8000);

    thread::scope(|s| {
        for t in 0..THREADS {
            let region = &region;
            s.spawn(move || {
                let mut rng = Rng::new(0x5EED + t);
                let mut mine: Vec<(usize, usize, u8)> = Vec::new();

                for _ in 0..ROUNDS {
                    if mine.len() < 16 && rng.range(0, 2) == 0 {
                        let size = rng.range(1, 256);
                        let tag = rng.next() as u8;
                        match region.alloc(&vec![tag; size], 32) {
                            Ok(addr) => {
                                assert_eq!(addr % 32, 0);
                                mine.push((addr, size, tag));
                            }
                            Err(DmaError::OutOfMemory) => {}
                            Err(e) => panic!("thread {}: {:?}", t, e),
                        }
                    } else if let Some((addr, size, tag)) = mine.pop() {
                        let mut out = vec![0u8; size];
                        region.read(addr, 0, &mut out).expect("Should read own buffer");
                        assert!(out.iter().all(|&b| b == tag), "thread {} saw foreign data", t);
                        region.free(addr).expect("Should free own buffer");
                    }
                }

                for (addr, _, _) in mine {
                    region.free(addr).expect("Should free own buffer");
                }
            });
        }
    });

    let snap = region.snapshot();
    assert!(snap.is_tiled());
    assert_eq!(snap.used_blocks().len(), 0);
    assert_eq!(snap.free_blocks().len(), 1);
}

#[test]
fn test_view_excludes_other_threads() {
    let region = HostedRegion::new(0x2000_0000, 0x1000);
    let addr = region.alloc(&[0u8; 64], 0).unwrap();

    let mut view = region.view(addr).unwrap();
    thread::scope(|s| {
        s.spawn(|| {
            assert_eq!(region.view(addr).unwrap_err(), DmaError::Busy);
            assert_eq!(region.free(addr), Err(DmaError::Busy));
        });
    });
    view[0] = 1;
    drop(view);

    region.free(addr).expect("Should free once the view is gone");
}

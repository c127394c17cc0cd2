//! Bulk Barrier Tests
//!
//! memcpy, memmove and memset against a plain byte model, at unaligned
//! offsets and across chunk boundaries.

mod common;

use common::{Op, TestEngine, WordBuffer};
use fstm::barrier::make_mask;
use fstm::barrier::stack::stack_pointer;
use fstm::{EagerBarrier, LazyBarrier, StmConfig, Transfer, WORD_SIZE};
use std::hint::black_box;

const W: usize = WORD_SIZE;
const FILL: u8 = 0x77;
const BUF_BYTES: usize = 2048;

fn eager() -> EagerBarrier {
    EagerBarrier::new(StmConfig::eager()).unwrap()
}

fn lazy() -> LazyBarrier {
    LazyBarrier::new(StmConfig::lazy()).unwrap()
}

/// Buffer whose bytes count up from 0, wrapping
fn patterned() -> WordBuffer {
    let mut buf = WordBuffer::new(BUF_BYTES / W, FILL);
    for (i, byte) in buf.bytes_mut().iter_mut().enumerate() {
        *byte = (i % 251) as u8;
    }
    buf
}

#[test]
fn test_memcpy_unaligned_small() {
    let barrier = eager();
    let mut buf = patterned();
    let mut tx = TestEngine::eager();
    let mut model = buf.bytes().to_vec();

    let (src, dst, len) = (3, 2 * W + 5, 2 * W + 1);
    model.copy_within(src..src + len, dst);
    unsafe { barrier.memcpy(&mut tx, buf.at::<u8>(dst), buf.at::<u8>(src), len) }.unwrap();

    assert_eq!(buf.bytes(), &model[..]);

    let writes: Vec<_> = tx
        .ops
        .iter()
        .filter_map(|op| match op {
            Op::Write { mask, .. } => Some(*mask),
            _ => None,
        })
        .collect();
    assert_eq!(writes.first(), Some(&make_mask(dst % W, W)));
    assert!(writes[1..writes.len() - 1].iter().all(|m| m.is_full()));
    let total: usize = writes.iter().map(|m| m.count_bytes()).sum();
    assert_eq!(total, len);
}

#[test]
fn test_memcpy_across_chunks() {
    let barrier = eager();
    let mut buf = patterned();
    let mut tx = TestEngine::eager();
    let mut model = buf.bytes().to_vec();

    let (src, dst, len) = (1, 1000, 700);
    model.copy_within(src..src + len, dst);
    unsafe { barrier.memcpy(&mut tx, buf.at::<u8>(dst), buf.at::<u8>(src), len) }.unwrap();

    assert_eq!(buf.bytes(), &model[..]);
}

#[test]
fn test_memcpy_lazy_sees_own_writes() {
    let barrier = lazy();
    let mut buf = patterned();
    let mut tx = TestEngine::lazy();
    let mut model = buf.bytes().to_vec();

    // first copy lands in the write set; the second copies from it
    model.copy_within(0..64, 100);
    model.copy_within(100..164, 300);
    unsafe {
        barrier.memcpy(&mut tx, buf.at::<u8>(100), buf.at::<u8>(0), 64).unwrap();
        barrier.memcpy(&mut tx, buf.at::<u8>(300), buf.at::<u8>(100), 64).unwrap();
    }
    assert!(tx.writes().is_empty());

    tx.commit();
    assert_eq!(buf.bytes(), &model[..]);
}

#[test]
fn test_memmove_overlapping_both_directions() {
    for (src, dst, len) in [(10, 13, 600), (13, 10, 600), (0, W + 1, 3 * W), (400, 5, 300)] {
        for lazy_mode in [false, true] {
            let mut buf = patterned();
            let mut model = buf.bytes().to_vec();
            model.copy_within(src..src + len, dst);

            if lazy_mode {
                let mut tx = TestEngine::lazy();
                unsafe { lazy().memmove(&mut tx, buf.at::<u8>(dst), buf.at::<u8>(src), len) }.unwrap();
                tx.commit();
            } else {
                let mut tx = TestEngine::eager();
                unsafe { eager().memmove(&mut tx, buf.at::<u8>(dst), buf.at::<u8>(src), len) }.unwrap();
            }

            assert_eq!(
                buf.bytes(),
                &model[..],
                "src {} dst {} len {} lazy {}",
                src,
                dst,
                len,
                lazy_mode
            );
        }
    }
}

#[test]
fn test_memset_partial_words() {
    let barrier = eager();
    let mut buf = WordBuffer::new(BUF_BYTES / W, FILL);
    let mut tx = TestEngine::eager();

    let (start, len) = (W - 3, 300);
    unsafe { barrier.memset(&mut tx, buf.at::<u8>(start), 0xEE, len) }.unwrap();

    assert!(buf.bytes()[start..start + len].iter().all(|b| *b == 0xEE));
    buf.assert_untouched_outside(start, start + len, FILL);
}

#[test]
fn test_memset_zero_length_is_noop() {
    let barrier = eager();
    let mut buf = WordBuffer::new(2, FILL);
    let mut tx = TestEngine::eager();

    unsafe { barrier.memset(&mut tx, buf.at::<u8>(1), 0, 0) }.unwrap();
    assert!(tx.ops.is_empty());
}

#[test]
fn test_non_transactional_source_issues_no_reads() {
    let barrier = eager();
    let mut buf = WordBuffer::new(8, FILL);
    let mut tx = TestEngine::eager();
    let private: Vec<u8> = (0..20).collect();

    unsafe {
        barrier.memcpy_with(
            &mut tx,
            buf.at::<u8>(2),
            Transfer::Transactional,
            private.as_ptr(),
            Transfer::NonTransactional,
            private.len(),
        )
    }
    .unwrap();

    assert!(tx.reads().is_empty());
    assert!(!tx.writes().is_empty());
    assert_eq!(&buf.bytes()[2..22], &private[..]);
}

#[test]
fn test_non_transactional_destination_issues_no_writes() {
    let barrier = eager();
    let mut buf = patterned();
    let mut tx = TestEngine::eager();
    let mut private = vec![0u8; 33];

    unsafe {
        barrier.memcpy_with(
            &mut tx,
            private.as_mut_ptr(),
            Transfer::NonTransactional,
            buf.at::<u8>(7),
            Transfer::Transactional,
            private.len(),
        )
    }
    .unwrap();

    assert!(tx.writes().is_empty());
    assert_eq!(&private[..], &buf.bytes()[7..40]);
}

#[test]
fn test_memset_on_outer_stack_frame_is_logged() {
    let barrier = eager();
    let mut tx = TestEngine::eager();
    let mut slots = [0u8; 40];
    let addr = black_box(slots.as_mut_ptr());

    tx.begin_scope(addr as usize + 4096);
    tx.begin_scope(stack_pointer());

    unsafe { barrier.memset(&mut tx, addr, 0xEE, 40) }.unwrap();
    assert_eq!(tx.ops, vec![Op::Log { addr: addr as usize, len: 40 }]);
    assert!(unsafe { std::slice::from_raw_parts(addr, 40) }.iter().all(|b| *b == 0xEE));

    tx.cancel_inner();
    assert!(unsafe { std::slice::from_raw_parts(addr, 40) }.iter().all(|b| *b == 0));
}

#[test]
fn test_log_range() {
    let barrier = eager();
    let mut tx = TestEngine::eager();
    let mut slots = [1u8; 16];
    let addr = black_box(slots.as_mut_ptr());

    tx.begin_scope(addr as usize + 4096);
    unsafe {
        barrier.log_range(&mut tx, addr, 16).unwrap();
        barrier.log_range(&mut tx, addr, 0).unwrap();
    }
    assert_eq!(tx.logs().len(), 1);
}

#[test]
fn test_abort_mid_memcpy() {
    let barrier = eager();
    let mut buf = patterned();
    let mut tx = TestEngine::eager().abort_after(3);

    let err = unsafe { barrier.memcpy(&mut tx, buf.at::<u8>(512), buf.at::<u8>(0), 100) }.unwrap_err();
    assert!(err.is_abort());
    assert!(tx.ops.len() <= 3);
}

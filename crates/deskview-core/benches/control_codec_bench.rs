//! Criterion benchmarks for the control-channel codec.
//!
//! Pointer updates are sent on every mouse move, so encoding a `mousepose`
//! frame sits on the input hot path.
//!
//! Run with:
//! ```bash
//! cargo bench --package deskview-core --bench control_codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use deskview_core::{
    commands, decode_control, encode_control, Dimensions, PointerPosition, ResolutionState,
    ScreenSize,
};

fn bench_encode_mousepose(c: &mut Criterion) {
    let pos = PointerPosition { x: 1024, y: 768 };
    c.bench_function("encode_mousepose", |b| {
        b.iter(|| encode_control(black_box(commands::MOUSE_POSE), black_box(&pos)).unwrap())
    });
}

fn bench_decode_screensize(c: &mut Criterion) {
    let frame = r#"{"command":"screensize","data":{"width":1920,"height":1080}}"#;
    c.bench_function("decode_screensize", |b| {
        b.iter(|| {
            let msg = decode_control(black_box(frame)).unwrap();
            msg.payload::<ScreenSize>().unwrap()
        })
    });
}

fn bench_canvas_to_screen(c: &mut Criterion) {
    let mut state = ResolutionState::new();
    state.set_screen(Dimensions::new(3840, 2160));
    state.set_canvas(Dimensions::new(1280, 720));
    c.bench_function("canvas_to_screen", |b| {
        b.iter(|| state.canvas_to_screen(black_box(640.5), black_box(360.25)))
    });
}

criterion_group!(
    benches,
    bench_encode_mousepose,
    bench_decode_screensize,
    bench_canvas_to_screen
);
criterion_main!(benches);

//! # Control Loop Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use comms_if::sim::{parse_frame, SimEvent};
use steer_lib::{ctrl_loop::CtrlLoop, params::SteerExecParams, twiddle::TwiddleParams};

fn ctrl_loop_benchmark(c: &mut Criterion) {
    // Tune from the first sample with short windows so advances are included
    let params = SteerExecParams {
        twiddle: TwiddleParams {
            enabled: true,
            warm_up_samples: 0,
            window: 50,
            ..Default::default()
        },
        ..Default::default()
    };

    let mut ctrl_loop = CtrlLoop::new(&params);
    let mut i = 0u64;

    c.bench_function("CtrlLoop::submit_sample", |b| {
        b.iter(|| {
            i += 1;
            ctrl_loop.submit_sample(black_box((i as f64 * 0.05).sin())).unwrap()
        })
    });

    let frame = r#"42["telemetry",{"cte":"0.7598","speed":"0.4380","steering_angle":"0.0000"}]"#;

    c.bench_function("sim::parse_frame", |b| {
        b.iter(|| match parse_frame(black_box(frame)).unwrap() {
            Some(SimEvent::Telemetry(t)) => t.cte,
            _ => panic!("Expected telemetry")
        })
    });
}

criterion_group!(benches, ctrl_loop_benchmark);
criterion_main!(benches);

//! Background sampler: event stream, status cadence and stop handling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use embedded_hal::spi::ErrorKind;

use tempctl::app::events::BridgeEvent;
use tempctl::app::sampler::Sampler;
use tempctl::config::SystemConfig;
use tempctl::error::LinkError;

use super::mock_hw::{ready_bridge_with, RecordingSink, FRAME_OPEN};

fn config(status_every: u32) -> SystemConfig {
    SystemConfig {
        sample_interval_ms: 250,
        status_every_samples: status_every,
        ..SystemConfig::default()
    }
}

#[test]
fn tick_reports_each_outcome_and_keeps_counting() {
    let cfg = config(0);
    let (bridge, spi, _pwm) = ready_bridge_with(&cfg);
    spi.push_frame(FRAME_OPEN);
    spi.push_error(ErrorKind::Other);

    let mut sampler = Sampler::new(Arc::new(bridge), &cfg);
    let mut sink = RecordingSink::default();
    for _ in 0..3 {
        let _ = sampler.tick(&mut sink);
    }

    let events = sink.events();
    assert_eq!(events.len(), 3);
    assert!(matches!(
        events[0],
        BridgeEvent::SampleFailed {
            count: 1,
            error: LinkError::ThermocoupleDisconnected
        }
    ));
    assert!(matches!(
        events[1],
        BridgeEvent::SampleFailed {
            count: 2,
            error: LinkError::TransportError(ErrorKind::Other)
        }
    ));
    assert!(matches!(events[2], BridgeEvent::Sampled { count: 3, .. }));
    assert_eq!(sampler.count(), 3);
}

#[test]
fn status_is_emitted_every_n_samples() {
    let cfg = config(2);
    let (bridge, _spi, _pwm) = ready_bridge_with(&cfg);
    let mut sampler = Sampler::new(Arc::new(bridge), &cfg);
    let mut sink = RecordingSink::default();

    for _ in 0..4 {
        sampler.tick(&mut sink).unwrap();
    }

    let statuses: Vec<_> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            BridgeEvent::Status(s) => Some(s.samples),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, [2, 4]);
}

#[test]
fn spawned_sampler_stops_when_flag_is_raised() {
    let cfg = config(0);
    let (bridge, spi, _pwm) = ready_bridge_with(&cfg);
    let stop = Arc::new(AtomicBool::new(false));
    let sink = RecordingSink::default();

    let handle = Sampler::new(Arc::new(bridge), &cfg)
        .spawn(sink.clone(), stop.clone())
        .unwrap();

    // First sample is immediate; give it a moment then stop mid-wait.
    thread::sleep(Duration::from_millis(100));
    stop.store(true, Ordering::Release);
    handle.join().unwrap();

    let events = sink.events();
    assert_eq!(
        events.first(),
        Some(&BridgeEvent::Started {
            sample_interval_ms: 250
        })
    );
    let Some(BridgeEvent::Stopped { samples }) = events.last().copied() else {
        panic!("last event was not Stopped: {events:?}");
    };
    assert!(samples >= 1);
    assert_eq!(u64::from(spi.transfers()), samples);
}

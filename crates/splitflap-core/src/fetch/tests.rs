use super::*;
use crate::{http::HttpError, status::StatusBoard};

const INTERVAL: u64 = 600_000;

fn summary() -> WeatherSummary {
    WeatherSummary {
        stations: 4,
        median_air_temp: 61.0,
        median_wind_speed: 8.0,
    }
}

/// Runs one cycle the way the task does, counting requests.
fn cycle(
    scheduler: &mut FetchScheduler,
    now_ms: u64,
    ready: bool,
    board: &StatusBoard,
    requests: &mut u32,
) -> CycleAction {
    let action = scheduler.begin_cycle(now_ms, ready, board);
    if action == CycleAction::Fetch {
        *requests += 1;
        scheduler.complete_fetch(now_ms, Ok(summary()), board);
    }
    scheduler.refresh_presentation(now_ms, board);
    action
}

#[test]
fn no_request_is_made_while_not_ready() {
    let mut scheduler = FetchScheduler::new(FetchConfig::default());
    let board = StatusBoard::new();
    let mut requests = 0;

    for step in 0..500u64 {
        let action = cycle(&mut scheduler, step * 5_000, false, &board, &mut requests);
        assert_eq!(action, CycleAction::WaitForNetwork { delay_ms: 5_000 });
    }
    assert_eq!(requests, 0);
    assert_eq!(scheduler.last_request(), None);
    assert_eq!(board.message(SlotId::DataSummary).as_str(), "Waiting for WiFi");
}

#[test]
fn waiting_notice_is_throttled() {
    let mut scheduler = FetchScheduler::new(FetchConfig::default());
    let board = StatusBoard::new();

    for now in (0..60_000u64).step_by(5_000) {
        scheduler.begin_cycle(now, false, &board);
    }
    // t=0 and t=30000 only.
    assert_eq!(board.revision(SlotId::DataSummary), 2);
}

#[test]
fn first_fetch_is_immediate_and_next_waits_full_interval() {
    let mut scheduler = FetchScheduler::new(FetchConfig::default());
    let board = StatusBoard::new();
    let mut requests = 0;

    assert_eq!(
        cycle(&mut scheduler, 0, true, &board, &mut requests),
        CycleAction::Fetch
    );
    assert_eq!(requests, 1);

    for now in (1_000..INTERVAL).step_by(999) {
        assert_eq!(
            cycle(&mut scheduler, now, true, &board, &mut requests),
            CycleAction::Idle { delay_ms: 1_000 }
        );
    }
    assert_eq!(requests, 1);

    assert_eq!(
        cycle(&mut scheduler, INTERVAL, true, &board, &mut requests),
        CycleAction::Fetch
    );
    assert_eq!(requests, 2);
    assert_eq!(scheduler.last_request(), Some(INTERVAL));
}

#[test]
fn readiness_loss_pauses_requests_without_resetting_timers() {
    let mut scheduler = FetchScheduler::new(FetchConfig::default());
    let board = StatusBoard::new();
    let mut requests = 0;

    cycle(&mut scheduler, 0, true, &board, &mut requests);
    cycle(&mut scheduler, INTERVAL, false, &board, &mut requests);
    assert_eq!(requests, 1);
    assert_eq!(
        cycle(&mut scheduler, INTERVAL + 5_000, true, &board, &mut requests),
        CycleAction::Fetch
    );
    assert_eq!(requests, 2);
}

#[test]
fn successful_fetch_updates_summary_slot() {
    let mut scheduler = FetchScheduler::new(FetchConfig::default());
    let board = StatusBoard::new();

    scheduler.complete_fetch(2_000, Ok(summary()), &board);
    assert_eq!(scheduler.last_success(), Some(2_000));
    assert_eq!(
        board.message(SlotId::DataSummary).as_str(),
        "Data: 61 f 9 mph (4 stations)"
    );
}

#[test]
fn zero_records_do_not_update_success_timestamp() {
    let mut scheduler = FetchScheduler::new(FetchConfig::default());
    let board = StatusBoard::new();

    scheduler.complete_fetch(1_000, Ok(summary()), &board);
    let empty = summarize_response(br#"{"STATION":[]}"#);
    assert_eq!(empty, Err(FetchError::NoData));
    scheduler.complete_fetch(INTERVAL + 1_000, empty, &board);

    assert_eq!(scheduler.last_success(), Some(1_000));
    assert_eq!(scheduler.last_request(), Some(INTERVAL + 1_000));
    assert_eq!(scheduler.failures(), 1);
    assert_eq!(board.message(SlotId::DataSummary).as_str(), "Data: no data");
}

#[test]
fn staleness_starts_strictly_after_three_intervals() {
    let mut scheduler = FetchScheduler::new(FetchConfig::default());
    let board = StatusBoard::new();
    let stale_after = 3 * INTERVAL;

    scheduler.complete_fetch(1_000, Ok(summary()), &board);
    scheduler.refresh_presentation(1_000 + stale_after, &board);
    assert!(!scheduler.is_stale());

    scheduler.refresh_presentation(1_000 + stale_after + 1, &board);
    assert!(scheduler.is_stale());
    assert_eq!(board.message(SlotId::DataSummary).as_str(), "Data: stale");
    assert_eq!(board.message(SlotId::Flaps).as_str(), "stale");
    assert_eq!(scheduler.flap_messages().len(), 1);
}

#[test]
fn success_clears_staleness_immediately() {
    let mut scheduler = FetchScheduler::new(FetchConfig::default());
    let board = StatusBoard::new();

    scheduler.complete_fetch(0, Ok(summary()), &board);
    scheduler.refresh_presentation(3 * INTERVAL + 1, &board);
    assert!(scheduler.is_stale());

    scheduler.complete_fetch(3 * INTERVAL + 2, Ok(summary()), &board);
    assert!(!scheduler.is_stale());
    scheduler.refresh_presentation(3 * INTERVAL + 2, &board);
    assert_eq!(board.message(SlotId::Flaps).as_str(), "61 f");
}

#[test]
fn failed_fetch_while_stale_keeps_stale_status() {
    let mut scheduler = FetchScheduler::new(FetchConfig::default());
    let board = StatusBoard::new();

    scheduler.complete_fetch(0, Ok(summary()), &board);
    scheduler.refresh_presentation(3 * INTERVAL + 1, &board);
    assert!(scheduler.is_stale());

    scheduler.complete_fetch(3 * INTERVAL + 2, Err(FetchError::NoData), &board);
    scheduler.refresh_presentation(3 * INTERVAL + 2, &board);
    assert!(scheduler.is_stale());
    assert_eq!(scheduler.failures(), 1);
    assert_eq!(board.message(SlotId::DataSummary).as_str(), "Data: stale");
    assert_eq!(board.message(SlotId::Flaps).as_str(), "stale");
}

#[test]
fn failures_alone_never_mark_stale() {
    let mut scheduler = FetchScheduler::new(FetchConfig::default());
    let board = StatusBoard::new();

    scheduler.complete_fetch(0, Err(FetchError::Malformed), &board);
    scheduler.refresh_presentation(10 * INTERVAL, &board);
    assert!(!scheduler.is_stale());
    assert_eq!(board.revision(SlotId::Flaps), 0);
}

#[test]
fn flap_messages_rotate_on_cycle() {
    let mut scheduler = FetchScheduler::new(FetchConfig::default());
    let board = StatusBoard::new();

    scheduler.complete_fetch(0, Ok(summary()), &board);
    scheduler.refresh_presentation(0, &board);
    assert_eq!(board.message(SlotId::Flaps).as_str(), "61 f");

    scheduler.refresh_presentation(3_999, &board);
    assert_eq!(board.message(SlotId::Flaps).as_str(), "61 f");

    scheduler.refresh_presentation(4_000, &board);
    assert_eq!(board.message(SlotId::Flaps).as_str(), "9 mph");

    scheduler.refresh_presentation(8_000, &board);
    assert_eq!(board.message(SlotId::Flaps).as_str(), "61 f");
    assert_eq!(board.revision(SlotId::Flaps), 3);
}

#[test]
fn http_status_and_transport_failures_are_distinct() {
    let response = HttpResponse {
        status: 500,
        body: br#"{"STATION":[]}"#,
    };
    assert_eq!(summarize_http(response), Err(FetchError::Status(500)));

    let transport: FetchError = RequestError::Timeout.into();
    assert_eq!(transport, FetchError::Transport(RequestError::Timeout));
    assert_ne!(
        FetchError::from(RequestError::Http(HttpError::IncompleteHead)),
        FetchError::Malformed
    );

    let ok = HttpResponse {
        status: 200,
        body: br#"{"STATION":[]}"#,
    };
    assert_eq!(summarize_http(ok), Err(FetchError::NoData));
}

#[test]
fn request_interval_builder_moves_stale_threshold() {
    let config = FetchConfig::default().with_request_interval_ms(60_000);
    assert_eq!(config.stale_after_ms, 180_000);
    assert_eq!(config.with_stale_after_ms(5).stale_after_ms, 5);
}

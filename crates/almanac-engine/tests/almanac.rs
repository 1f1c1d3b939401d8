mod common;

use std::fs;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use almanac_engine::{Almanac, AlmanacError, Answer, HistoricalStore};
use chrono::NaiveDate;
use common::{config_in, forecast_max, observed_max, ymd, FakeWeather};

/// Monday, June 10, 2024.
fn today() -> NaiveDate {
    ymd(2024, 6, 10)
}

async fn open_almanac(
    dir: &tempfile::TempDir,
    source: FakeWeather,
) -> (Almanac<Arc<FakeWeather>>, Arc<FakeWeather>) {
    let source = Arc::new(source);
    let almanac = Almanac::open(config_in(dir.path()), Arc::clone(&source), today())
        .await
        .unwrap();
    (almanac, source)
}

fn historical_text(date: NaiveDate) -> String {
    format!(
        "On {date}, max was {:.1}°F and min was {:.1}°F.",
        observed_max(date),
        observed_max(date) - 20.0
    )
}

// ── Scenario tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_last_monday_on_a_monday_reads_history() {
    let dir = tempfile::tempdir().unwrap();
    let (almanac, source) = open_almanac(&dir, FakeWeather::new(today())).await;

    let text = almanac.generate_response_at("Last Monday", today()).await.unwrap();
    assert_eq!(text, historical_text(ymd(2024, 6, 3)));
    assert_eq!(source.forecast_calls(), 0);
    // bootstrap only; the store already reaches today
    assert_eq!(source.history_calls(), 1);
}

#[tokio::test]
async fn test_next_thursday_reads_forecast() {
    let dir = tempfile::tempdir().unwrap();
    let (almanac, source) = open_almanac(&dir, FakeWeather::new(today())).await;

    let answer = almanac.respond("next thursday", today()).await.unwrap();
    let expected = ymd(2024, 6, 20);
    assert_eq!(
        answer,
        Answer::Forecast {
            date: expected,
            temp_max: forecast_max(expected),
            temp_min: forecast_max(expected) - 15.0,
        }
    );
    assert!(answer
        .to_string()
        .starts_with("On 2024-06-20, the forecast max will be"));
    assert_eq!(source.forecast_calls(), 1);
}

#[tokio::test]
async fn test_american_date_reads_history() {
    let dir = tempfile::tempdir().unwrap();
    let (almanac, _) = open_almanac(&dir, FakeWeather::new(today())).await;

    let text = almanac.generate_response_at("06/01/2022", today()).await.unwrap();
    assert_eq!(text, historical_text(ymd(2022, 6, 1)));
}

#[tokio::test]
async fn test_date_before_start_names_start() {
    let dir = tempfile::tempdir().unwrap();
    let (almanac, source) = open_almanac(&dir, FakeWeather::new(today())).await;

    let text = almanac.generate_response_at("2021-12-31", today()).await.unwrap();
    assert_eq!(text, "Sorry, I only have historical data from 2022-01-01 onward.");
    assert_eq!(source.history_calls(), 1);
    assert_eq!(source.forecast_calls(), 0);
}

#[tokio::test]
async fn test_today_is_never_forecast() {
    let dir = tempfile::tempdir().unwrap();
    let (almanac, source) = open_almanac(&dir, FakeWeather::new(today())).await;

    let answer = almanac.respond("what's it like today?", today()).await.unwrap();
    assert!(matches!(answer, Answer::Historical(r) if r.date == today()));

    let answer = almanac.respond("2024-06-10", today()).await.unwrap();
    assert!(matches!(answer, Answer::Historical(r) if r.date == today()));
    assert_eq!(source.forecast_calls(), 0);
}

#[tokio::test]
async fn test_forecast_horizon_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let (almanac, source) = open_almanac(&dir, FakeWeather::new(today())).await;

    let last = almanac.respond("2024-06-25", today()).await.unwrap();
    assert!(matches!(last, Answer::Forecast { date, .. } if date == ymd(2024, 6, 25)));

    let beyond = almanac.generate_response_at("06/26/2024", today()).await.unwrap();
    assert_eq!(beyond, "Sorry, I can only forecast up to the next 16 days.");
    assert_eq!(source.forecast_calls(), 1);
}

#[tokio::test]
async fn test_unresolved_lists_accepted_forms() {
    let dir = tempfile::tempdir().unwrap();
    let (almanac, source) = open_almanac(&dir, FakeWeather::new(today())).await;

    let text = almanac.generate_response_at("how about soon", today()).await.unwrap();
    assert!(text.starts_with("I couldn't parse your date."), "got: {text}");
    assert!(text.contains("Historical range: 2022-01-01 to today"), "got: {text}");
    assert_eq!(source.forecast_calls(), 0);
}

// ── Missing data tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_forecast_without_the_date_reports_no_forecast_data() {
    let dir = tempfile::tempdir().unwrap();
    let mut fake = FakeWeather::new(today());
    fake.forecast_missing = vec![ymd(2024, 6, 20)];
    let (almanac, _) = open_almanac(&dir, fake).await;

    let text = almanac.generate_response_at("next thursday", today()).await.unwrap();
    assert_eq!(text, "Sorry, I have no forecast data for 2024-06-20.");
}

#[tokio::test]
async fn test_lagging_archive_day_reports_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.start_date = ymd(2022, 3, 1);
    fs::create_dir_all(config.data_path.parent().unwrap()).unwrap();
    fs::write(
        &config.data_path,
        "date,temp_max,temp_min\n2022-03-01,50,30\n2022-03-02,51,31\n",
    )
    .unwrap();
    let mut fake = FakeWeather::new(ymd(2022, 3, 5));
    fake.history_lag = 2;
    let source = Arc::new(fake);
    let later = ymd(2022, 3, 5);
    let almanac = Almanac::open(config, Arc::clone(&source), later).await.unwrap();

    let text = almanac.generate_response_at("yesterday", later).await.unwrap();
    assert_eq!(text, "Sorry, I have no data for 2022-03-04.");

    let text = almanac.generate_response_at("2022-03-03", later).await.unwrap();
    assert_eq!(text, historical_text(ymd(2022, 3, 3)));

    let text = almanac.generate_response_at("03/01/2022", later).await.unwrap();
    assert_eq!(text, "On 2022-03-01, max was 50.0°F and min was 30.0°F.");
    assert_eq!(source.history_calls(), 1);
}

#[tokio::test]
async fn test_store_beginning_after_start_date_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    fs::create_dir_all(config.data_path.parent().unwrap()).unwrap();
    fs::write(
        &config.data_path,
        "date,temp_max,temp_min\n2022-03-01,50,30\n2022-03-02,51,31\n",
    )
    .unwrap();
    let source = Arc::new(FakeWeather::new(ymd(2022, 3, 2)));
    let almanac = Almanac::open(config, Arc::clone(&source), ymd(2022, 3, 2))
        .await
        .unwrap();

    let text = almanac
        .generate_response_at("2022-02-01", ymd(2022, 3, 2))
        .await
        .unwrap();
    assert_eq!(text, historical_text(ymd(2022, 2, 1)));
    assert_eq!(almanac.stored_days().await, 61);
    assert_eq!(source.history_calls(), 1);
}

// ── Failure tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_forecast_failure_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let (almanac, source) = open_almanac(&dir, FakeWeather::new(today())).await;
    source.fail_forecast.store(true, Ordering::SeqCst);

    let err = almanac.respond("tomorrow", today()).await.unwrap_err();
    assert!(matches!(err, AlmanacError::Fetch(_)));
}

#[tokio::test]
async fn test_refresh_failure_is_an_error_and_keeps_store() {
    let dir = tempfile::tempdir().unwrap();
    let (almanac, source) = open_almanac(&dir, FakeWeather::new(today())).await;
    let before = almanac.stored_days().await;
    source.fail_history.store(true, Ordering::SeqCst);

    let later = ymd(2024, 6, 12);
    let err = almanac.respond("yesterday", later).await.unwrap_err();
    assert!(matches!(err, AlmanacError::Fetch(_)));
    assert_eq!(almanac.stored_days().await, before);

    source.fail_history.store(false, Ordering::SeqCst);
    let text = almanac.generate_response_at("yesterday", later).await.unwrap();
    assert_eq!(text, historical_text(ymd(2024, 6, 11)));
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.forecast_days = 0;
    let source = Arc::new(FakeWeather::new(today()));

    let result = Almanac::open(config, Arc::clone(&source), today()).await;
    assert!(matches!(result, Err(AlmanacError::Config(_))));
    assert_eq!(source.history_calls(), 0);
}

// ── Refresh tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_historical_question_refreshes_missing_days_once() {
    let dir = tempfile::tempdir().unwrap();
    let (almanac, source) = open_almanac(&dir, FakeWeather::new(today())).await;
    let later = ymd(2024, 6, 13);

    almanac.respond("yesterday", later).await.unwrap();
    almanac.respond("last tuesday", later).await.unwrap();

    assert_eq!(source.history_calls(), 2);
    assert_eq!(
        *source.history_ranges.lock().unwrap().last().unwrap(),
        (ymd(2024, 6, 11), later)
    );
}

#[tokio::test]
async fn test_forecast_question_does_not_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let (almanac, source) = open_almanac(&dir, FakeWeather::new(ymd(2024, 6, 13))).await;

    almanac.respond("tomorrow", ymd(2024, 6, 13)).await.unwrap();
    assert_eq!(source.history_calls(), 1);
}

#[tokio::test]
async fn test_restart_reads_appended_days_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let (almanac, _) = open_almanac(&dir, FakeWeather::new(today())).await;
    let later = ymd(2024, 6, 20);
    almanac.refresh(later).await.unwrap();
    let days = almanac.stored_days().await;
    drop(almanac);

    let config = config_in(dir.path());
    let store = HistoricalStore::load(&config.data_path, config.start_date).unwrap();
    assert_eq!(store.len(), days);
    assert_eq!(store.last_date(), Some(later));

    let fresh = Arc::new(FakeWeather::new(later));
    let reopened = Almanac::open(config, Arc::clone(&fresh), later).await.unwrap();
    assert_eq!(reopened.stored_days().await, days);
    assert_eq!(fresh.history_calls(), 0);
}

#[tokio::test]
async fn test_concurrent_questions_share_one_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let (almanac, source) = open_almanac(&dir, FakeWeather::new(today())).await;
    let almanac = Arc::new(almanac);
    let later = ymd(2024, 6, 15);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let almanac = Arc::clone(&almanac);
            tokio::spawn(async move { almanac.respond("yesterday", later).await })
        })
        .collect();
    for handle in handles {
        let answer = handle.await.unwrap().unwrap();
        assert!(matches!(answer, Answer::Historical(r) if r.date == ymd(2024, 6, 14)));
    }

    assert_eq!(source.history_calls(), 2);
}

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::Notify;

use common::{FakePlatform, FakeSummarizer, bot, configured, human, runner, store_with};
use tldr_digest::core::models::{DigestOutcome, NotConfigured};
use tldr_digest::core::store::PersistedConfig;
use tldr_digest::errors::BotError;
use tldr_digest::worker::Trigger;

#[tokio::test]
async fn posts_one_block_for_the_only_active_channel() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(
        FakePlatform::new()
            .with_channel("S", "digests", Vec::new())
            .with_channel(
                "A",
                "alpha",
                vec![
                    human(40, "first"),
                    bot(35, "deploy finished"),
                    human(30, "second"),
                    human(10, "third"),
                ],
            )
            .with_channel("B", "beta", Vec::new()),
    );
    let summarizer = Arc::new(FakeSummarizer::new());
    let store = store_with(&dir, configured("S", &["A", "B"])).await;
    let runner = runner(platform.clone(), summarizer.clone(), store.clone());

    let outcome = runner.run(Trigger::Manual).await.unwrap();

    assert!(matches!(
        outcome,
        DigestOutcome::Posted {
            channels: 1,
            total_messages: 3,
            ..
        }
    ));

    let calls = summarizer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, "alpha");
    let lines: Vec<&str> = calls[0].0.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("jane: first"));
    assert!(lines[2].ends_with("jane: third"));
    assert!(!calls[0].0.contains("deploy finished"));

    let posted = platform.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].0, "S");
    let digest = &posted[0].1;
    assert!(digest.header.starts_with("TLDR Summary "));
    assert_eq!(digest.blocks.len(), 1);
    assert_eq!(digest.blocks[0].title, "Summary for #alpha");
    assert_eq!(digest.blocks[0].body, "summary of alpha");
    assert!(digest.blocks[0].footer.starts_with("3 messages summarized • "));

    assert!(store.get().await.last_summary_time.is_some());
}

#[tokio::test]
async fn window_widens_to_last_successful_run() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(
        FakePlatform::new()
            .with_channel("S", "digests", Vec::new())
            .with_channel(
                "A",
                "alpha",
                vec![
                    human(240, "too old"),
                    human(120, "two hours ago"),
                    human(60, "one hour ago"),
                ],
            ),
    );
    let summarizer = Arc::new(FakeSummarizer::new());
    let mut config = configured("S", &["A"]);
    config.last_summary_time = Some(Utc::now() - Duration::hours(3));
    let store = store_with(&dir, config).await;
    let runner = runner(platform.clone(), summarizer.clone(), store);

    let outcome = runner.run(Trigger::Scheduled).await.unwrap();

    assert!(matches!(
        outcome,
        DigestOutcome::Posted {
            channels: 1,
            total_messages: 2,
            ..
        }
    ));
    let transcript = &summarizer.calls()[0].0;
    assert!(transcript.contains("two hours ago"));
    assert!(transcript.contains("one hour ago"));
    assert!(!transcript.contains("too old"));
}

#[tokio::test]
async fn default_window_is_one_hour() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(
        FakePlatform::new()
            .with_channel("S", "digests", Vec::new())
            .with_channel("A", "alpha", vec![human(90, "stale"), human(5, "fresh")]),
    );
    let summarizer = Arc::new(FakeSummarizer::new());
    let store = store_with(&dir, configured("S", &["A"])).await;
    let runner = runner(platform, summarizer.clone(), store);

    runner.run(Trigger::Scheduled).await.unwrap();

    let transcript = &summarizer.calls()[0].0;
    assert!(transcript.contains("fresh"));
    assert!(!transcript.contains("stale"));
}

#[tokio::test]
async fn all_summaries_failing_is_an_error_without_post() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(
        FakePlatform::new()
            .with_channel("S", "digests", Vec::new())
            .with_channel("A", "alpha", vec![human(5, "hello")])
            .with_channel("B", "beta", vec![human(5, "hi")]),
    );
    let summarizer = Arc::new(
        FakeSummarizer::new()
            .failing_for("alpha")
            .failing_for("beta"),
    );
    let store = store_with(&dir, configured("S", &["A", "B"])).await;
    let runner = runner(platform.clone(), summarizer.clone(), store.clone());

    let result = runner.run(Trigger::Scheduled).await;

    assert!(matches!(result, Err(BotError::GeneralError(_))));
    assert_eq!(summarizer.calls().len(), 2);
    assert!(platform.posted().is_empty());
    assert!(store.get().await.last_summary_time.is_none());
}

#[tokio::test]
async fn failed_channel_is_omitted_from_digest() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(
        FakePlatform::new()
            .with_channel("S", "digests", Vec::new())
            .with_channel("A", "alpha", vec![human(5, "hello")])
            .with_channel("B", "beta", vec![human(5, "hi"), human(4, "again")]),
    );
    let summarizer = Arc::new(FakeSummarizer::new().failing_for("alpha"));
    let store = store_with(&dir, configured("S", &["A", "B"])).await;
    let runner = runner(platform.clone(), summarizer, store);

    let outcome = runner.run(Trigger::Scheduled).await.unwrap();

    assert!(matches!(
        outcome,
        DigestOutcome::Posted {
            channels: 1,
            total_messages: 3,
            ..
        }
    ));
    let posted = platform.posted();
    assert_eq!(posted[0].1.blocks.len(), 1);
    assert_eq!(posted[0].1.blocks[0].title, "Summary for #beta");
}

#[tokio::test]
async fn unconfigured_run_makes_no_calls() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(FakePlatform::new());
    let summarizer = Arc::new(FakeSummarizer::new());
    let store = store_with(&dir, PersistedConfig::default()).await;
    let runner = runner(platform.clone(), summarizer.clone(), store.clone());

    let outcome = runner.run(Trigger::Scheduled).await.unwrap();

    assert_eq!(
        outcome,
        DigestOutcome::NotConfigured(NotConfigured::NoSummaryChannel)
    );
    assert_eq!(platform.call_count(), 0);
    assert!(summarizer.calls().is_empty());
    assert!(store.get().await.last_summary_time.is_none());
}

#[tokio::test]
async fn no_monitored_channels_makes_no_calls() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(FakePlatform::new().with_channel("S", "digests", Vec::new()));
    let summarizer = Arc::new(FakeSummarizer::new());
    let store = store_with(&dir, configured("S", &[])).await;
    let runner = runner(platform.clone(), summarizer, store);

    let outcome = runner.run(Trigger::Manual).await.unwrap();

    assert_eq!(
        outcome,
        DigestOutcome::NotConfigured(NotConfigured::NoMonitoredChannels)
    );
    assert_eq!(platform.call_count(), 0);
}

#[tokio::test]
async fn quiet_run_posts_nothing_but_advances_window() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(
        FakePlatform::new()
            .with_channel("S", "digests", Vec::new())
            .with_channel("A", "alpha", vec![bot(5, "cron ok"), human(120, "old news")]),
    );
    let summarizer = Arc::new(FakeSummarizer::new());
    let store = store_with(&dir, configured("S", &["A"])).await;
    let runner = runner(platform.clone(), summarizer.clone(), store.clone());

    let before = Utc::now();
    let outcome = runner.run(Trigger::Scheduled).await.unwrap();

    assert!(matches!(outcome, DigestOutcome::Quiet { .. }));
    assert!(platform.posted().is_empty());
    assert!(summarizer.calls().is_empty());
    let last = store.get().await.last_summary_time.unwrap();
    assert!(last >= before);
}

#[tokio::test]
async fn blocks_follow_monitored_order() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(
        FakePlatform::new()
            .with_channel("S", "digests", Vec::new())
            .with_channel("A", "alpha", vec![human(5, "a")])
            .with_channel("B", "beta", vec![human(5, "b")])
            .with_channel("C", "gamma", vec![human(5, "c")]),
    );
    let summarizer = Arc::new(FakeSummarizer::new());
    let store = store_with(&dir, configured("S", &["C", "A", "B"])).await;
    let runner = runner(platform.clone(), summarizer.clone(), store);

    runner.run(Trigger::Manual).await.unwrap();

    let titles: Vec<String> = platform.posted()[0]
        .1
        .blocks
        .iter()
        .map(|b| b.title.clone())
        .collect();
    assert_eq!(
        titles,
        vec!["Summary for #gamma", "Summary for #alpha", "Summary for #beta"]
    );
    let labels: Vec<String> = summarizer.calls().into_iter().map(|(_, l)| l).collect();
    assert_eq!(labels, vec!["gamma", "alpha", "beta"]);
}

#[tokio::test]
async fn unreadable_channels_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(
        FakePlatform::new()
            .with_channel("S", "digests", Vec::new())
            .with_failing_history("A", "alpha")
            .with_non_text_channel("V", "archived")
            .with_channel("B", "beta", vec![human(5, "b")]),
    );
    let summarizer = Arc::new(FakeSummarizer::new());
    let store = store_with(&dir, configured("S", &["A", "GONE", "V", "B"])).await;
    let runner = runner(platform.clone(), summarizer.clone(), store);

    let outcome = runner.run(Trigger::Scheduled).await.unwrap();

    assert!(matches!(
        outcome,
        DigestOutcome::Posted {
            channels: 1,
            total_messages: 1,
            ..
        }
    ));
    assert_eq!(summarizer.calls().len(), 1);
}

#[tokio::test]
async fn missing_destination_fails_before_collecting() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(FakePlatform::new().with_channel("A", "alpha", vec![human(5, "a")]));
    let summarizer = Arc::new(FakeSummarizer::new());
    let store = store_with(&dir, configured("S", &["A"])).await;
    let runner = runner(platform.clone(), summarizer.clone(), store.clone());

    let result = runner.run(Trigger::Scheduled).await;

    assert!(matches!(result, Err(BotError::ApiError(_))));
    assert!(summarizer.calls().is_empty());
    assert!(store.get().await.last_summary_time.is_none());
}

#[tokio::test]
async fn failed_post_keeps_window_for_next_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut platform = FakePlatform::new()
        .with_channel("S", "digests", Vec::new())
        .with_channel("A", "alpha", vec![human(5, "a")]);
    platform.fail_post = true;
    let platform = Arc::new(platform);
    let summarizer = Arc::new(FakeSummarizer::new());
    let store = store_with(&dir, configured("S", &["A"])).await;
    let runner = runner(platform, summarizer, store.clone());

    assert!(runner.run(Trigger::Scheduled).await.is_err());
    assert!(store.get().await.last_summary_time.is_none());
}

#[tokio::test]
async fn successful_run_persists_last_summary_time() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(
        FakePlatform::new()
            .with_channel("S", "digests", Vec::new())
            .with_channel("A", "alpha", vec![human(5, "a")]),
    );
    let summarizer = Arc::new(FakeSummarizer::new());
    let store = store_with(&dir, configured("S", &["A"])).await;
    let runner = runner(platform, summarizer, store.clone());

    runner.run(Trigger::Scheduled).await.unwrap();

    let on_disk = store.reload().await.unwrap();
    assert!(on_disk.last_summary_time.is_some());
    assert_eq!(on_disk, store.get().await);
}

#[tokio::test]
async fn concurrent_run_reports_busy() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(
        FakePlatform::new()
            .with_channel("S", "digests", Vec::new())
            .with_channel("A", "alpha", vec![human(5, "a")]),
    );
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let summarizer = Arc::new(FakeSummarizer::new().gated(entered.clone(), release.clone()));
    let store = store_with(&dir, configured("S", &["A"])).await;
    let runner = Arc::new(runner(platform.clone(), summarizer, store));

    let first = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.run(Trigger::Scheduled).await })
    };
    entered.notified().await;

    assert!(runner.is_running());
    assert_eq!(
        runner.run(Trigger::Manual).await.unwrap(),
        DigestOutcome::Busy
    );

    release.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert!(matches!(outcome, DigestOutcome::Posted { .. }));
    assert_eq!(platform.posted().len(), 1);
    assert!(!runner.is_running());
}

#[tokio::test]
async fn last_summary_time_is_the_window_end_not_completion() {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(
        FakePlatform::new()
            .with_channel("S", "digests", Vec::new())
            .with_channel("A", "alpha", vec![human(5, "a")]),
    );
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let summarizer = Arc::new(FakeSummarizer::new().gated(entered.clone(), release.clone()));
    let store = store_with(&dir, configured("S", &["A"])).await;
    let runner = Arc::new(runner(platform, summarizer, store.clone()));

    let run = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.run(Trigger::Scheduled).await })
    };
    entered.notified().await;
    // Anything posted from here on was not part of this run's window.
    let mid_run = Utc::now();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    release.notify_one();

    let outcome = run.await.unwrap().unwrap();
    let window_end = outcome.window_end().unwrap();
    let stored = store.get().await.last_summary_time.unwrap();

    assert_eq!(stored, window_end);
    assert!(stored <= mid_run);
}

// ABOUTME: Integration tests for the execution facade.
// ABOUTME: Covers captured runs, inventory discovery, and multi-session streaming.

mod support;

use panda::error::Error;
use panda::exec::{
    StreamJob, build_tail_command, discover, discover_in_session, run_and_close, run_in_session,
    stream_all, tail,
};
use panda::tee::LineSink;
use std::time::Duration;
use support::channel::{Step, finished_command, scripted_session};
use support::remote::ScriptedConnection;

const LONG: Duration = Duration::from_secs(5);

#[tokio::test]
async fn run_closes_session_after_success() {
    let (session, log) = scripted_session("qa1", finished_command("ok\n", "", 0));

    let result = run_in_session(session, "echo ok", LONG).await.unwrap();

    assert_eq!(result.stdout, "ok\n");
    assert_eq!(log.lock().closes, 1);
}

#[tokio::test]
async fn run_closes_session_after_timeout() {
    let (session, log) = scripted_session("qa1", [Step::success(), Step::Hang]);

    let err = run_in_session(session, "sleep 60", Duration::from_millis(30))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Ssh(panda::ssh::Error::CommandTimedOut(_))
    ));
    assert_eq!(log.lock().closes, 1);
}

#[tokio::test]
async fn discovery_parses_script_output() {
    let listing = "name:shop\tpath:/var/www/vhosts/shop\tbranch:main\tdate:2 days ago (abc1234)\n\
                   name:blog\tpath:/var/www/vhosts/blog\tbranch:\tdate:\n";
    let (session, log) = scripted_session("qa1", finished_command(listing, "", 0));

    let records = discover_in_session(session, "list-vhosts", LONG).await.unwrap();

    assert_eq!(log.lock().commands, ["list-vhosts"]);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "shop");
    assert_eq!(records[0].branch, "main");
    assert_eq!(records[1].name, "blog");
    assert!(!records[1].has_branch());
}

#[tokio::test]
async fn discovery_keeps_partial_output_of_failing_script() {
    let (session, _) = scripted_session(
        "qa1",
        finished_command("name:shop\tpath:/x\n", "cd: permission denied\n", 1),
    );

    let records = discover_in_session(session, "list-vhosts", LONG).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn discovery_with_empty_script_runs_nothing() {
    let (session, log) = scripted_session("qa1", Vec::new());

    let records = discover_in_session(session, "   ", LONG).await.unwrap();

    assert!(records.is_empty());
    assert!(log.lock().commands.is_empty());
}

#[tokio::test]
async fn malformed_listing_is_reported() {
    let (session, _) = scripted_session("qa1", finished_command("name:a\nbroken\n", "", 0));

    let err = discover_in_session(session, "list", LONG).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Inventory(panda::inventory::Error::MalformedRecord { line: 2, .. })
    ));
}

#[tokio::test]
async fn tails_of_several_entries_share_one_sink() {
    let mut jobs = Vec::new();
    let mut logs = Vec::new();
    for (name, lines) in [("shop", "s1\ns2\n"), ("blog", "b1\n")] {
        let (session, log) = scripted_session(
            "qa1",
            [
                Step::success(),
                Step::stdout(lines),
                Step::delay_ms(10),
                Step::exit(0),
                Step::eof(),
                Step::close(),
            ],
        );
        jobs.push(StreamJob {
            label: name.to_string(),
            session,
            command: build_tail_command("tail -f", "/logs/%s.log", name).unwrap(),
        });
        logs.push(log);
    }
    let sink = LineSink::new(Vec::new());

    let statuses = stream_all(jobs, &sink).await.unwrap();

    assert_eq!(statuses, [("shop".to_string(), 0), ("blog".to_string(), 0)]);
    assert_eq!(logs[0].lock().commands, ["tail -f /logs/shop.log"]);
    assert_eq!(logs[1].lock().commands, ["tail -f /logs/blog.log"]);
    assert!(logs.iter().all(|log| log.lock().closes == 1));

    let text = String::from_utf8(sink.into_inner()).unwrap();
    let mut lines: Vec<_> = text.lines().collect();
    lines.sort_unstable();
    assert_eq!(
        lines,
        [
            "blog       out >> b1",
            "shop       out >> s1",
            "shop       out >> s2",
        ]
    );
}

#[tokio::test]
async fn one_failed_tail_does_not_cut_others_short() {
    let (good, good_log) = scripted_session("qa1", finished_command("line\n", "", 0));
    let (bad, _) = scripted_session("qa1", [Step::failure()]);
    let jobs = vec![
        StreamJob {
            label: "bad".to_string(),
            session: bad,
            command: "tail -f /missing".to_string(),
        },
        StreamJob {
            label: "good".to_string(),
            session: good,
            command: "tail -f /ok".to_string(),
        },
    ];
    let sink = LineSink::new(Vec::new());

    let err = stream_all(jobs, &sink).await.unwrap_err();

    assert!(matches!(err, Error::Ssh(panda::ssh::Error::Transport(_))));
    assert_eq!(good_log.lock().closes, 1);
    let text = String::from_utf8(sink.into_inner()).unwrap();
    assert_eq!(text, "good       out >> line\n");
}

#[tokio::test]
async fn connection_is_released_after_a_successful_command() {
    let (session, log) = scripted_session("qa1", finished_command("done\n", "", 0));
    let connection = ScriptedConnection::new("qa1:22", [session]);

    let result = run_and_close(&connection, "deploy", LONG).await.unwrap();

    assert_eq!(result.stdout, "done\n");
    assert_eq!(log.lock().commands, ["deploy"]);
    assert_eq!(log.lock().closes, 1);
    assert_eq!(connection.closes(), 1);
}

#[tokio::test]
async fn connection_is_released_after_a_timed_out_command() {
    let (session, log) = scripted_session("qa1", [Step::success(), Step::Hang]);
    let connection = ScriptedConnection::new("qa1:22", [session]);

    let err = run_and_close(&connection, "sleep 60", Duration::from_millis(30))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Ssh(panda::ssh::Error::CommandTimedOut(_))
    ));
    assert_eq!(log.lock().closes, 1);
    assert_eq!(connection.closes(), 1);
}

#[tokio::test]
async fn connection_is_released_when_no_session_opens() {
    let connection = ScriptedConnection::new("qa1:22", Vec::new());

    let err = run_and_close(&connection, "uptime", LONG).await.unwrap_err();

    assert!(matches!(err, Error::Ssh(panda::ssh::Error::Transport(_))));
    assert_eq!(connection.closes(), 1);
}

#[tokio::test]
async fn discovery_opens_a_session_on_the_connection() {
    let (session, log) = scripted_session("qa1", finished_command("name:shop\tbranch:feature/cart\n", "", 0));
    let connection = ScriptedConnection::new("qa1:22", [session]);

    let records = discover(&connection, "list-vhosts", LONG).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "shop");
    assert_eq!(records[0].branch, "feature/cart");
    assert_eq!(log.lock().commands, ["list-vhosts"]);
    assert_eq!(connection.closes(), 0);
}

#[tokio::test]
async fn tail_opens_one_session_per_entry() {
    let (shop, shop_log) = scripted_session("qa1", finished_command("s1\n", "", 0));
    let (blog, blog_log) = scripted_session("qa1", finished_command("b1\n", "", 0));
    let connection = ScriptedConnection::new("qa1:22", [shop, blog]);
    let names = ["shop".to_string(), "blog".to_string()];
    let sink = LineSink::new(Vec::new());

    let statuses = tail(&connection, &names, "tail -f", "/logs/%s.log", &sink)
        .await
        .unwrap();

    assert_eq!(statuses, [("shop".to_string(), 0), ("blog".to_string(), 0)]);
    assert_eq!(shop_log.lock().commands, ["tail -f /logs/shop.log"]);
    assert_eq!(blog_log.lock().commands, ["tail -f /logs/blog.log"]);
}

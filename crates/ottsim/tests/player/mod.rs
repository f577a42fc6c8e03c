use std::{sync::Arc, time::Duration};

use ottsim::{
    scheduler::StreamOutcome, FailurePolicy, OttError, PlaybackOptions, Player, PlayerState,
};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::MockServer;

use crate::{client, AssertWrapper, OriginMock};

/// Two streams with 10 second chunks.
const LONG_ISM: &str = r#"<SmoothStreamingMedia MajorVersion="2" MinorVersion="0">
  <StreamIndex Type="video" Url="QualityLevels({bitrate})/Fragments(video={start time})">
    <QualityLevel Index="0" Bitrate="1000000"/>
    <c d="100000000" r="5"/>
  </StreamIndex>
  <StreamIndex Type="audio" Url="QualityLevels({bitrate})/Fragments(audio={start time})">
    <QualityLevel Index="0" Bitrate="96000"/>
    <c d="100000000" r="5"/>
  </StreamIndex>
</SmoothStreamingMedia>"#;

async fn wait_for_state(player: &Player, state: PlayerState) {
    for _ in 0..200 {
        if player.state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("player never reached {state:?}");
}

async fn wait_for_chunk_requests(server: &MockServer, count: usize) {
    for _ in 0..200 {
        let chunks = server
            .requested_paths()
            .await
            .into_iter()
            .filter(|p| p.contains("Fragments"))
            .count();
        if chunks >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{count} chunk requests never arrived");
}

#[tokio::test]
async fn test_manifest_not_found() {
    let server = MockServer::start().await;
    let url = Url::parse(&format!("{}/missing.mpd", server.uri())).assert_success();

    let mut player = Player::new(client(), url);
    let error = player.load().await.unwrap_err();
    match error {
        OttError::ManifestFetchError(url, source) => {
            assert_eq!(url.path(), "/missing.mpd");
            assert!(matches!(
                *source,
                OttError::HttpError(status) if status.as_u16() == 404
            ));
        }
        e => panic!("unexpected error {e:?}"),
    }
    assert_eq!(player.state(), PlayerState::NotLoaded);
}

#[tokio::test]
async fn test_unknown_protocol() {
    let server = MockServer::start().await;
    let url = server
        .mock_manifest("/live/index.m3u8", "#EXTM3U\n#EXT-X-TARGETDURATION:2\n")
        .await;

    let mut player = Player::new(client(), url);
    assert!(matches!(
        player.load().await,
        Err(OttError::UnknownProtocol(_))
    ));
    assert_eq!(player.state(), PlayerState::NotLoaded);
}

#[tokio::test]
async fn test_stop() {
    let server = MockServer::start().await;
    let url = server.mock_manifest("/asset.ism/Manifest", LONG_ISM).await;
    server.mock_chunks(r"^/asset\.ism/QualityLevels", 16).await;

    let mut player = Player::new(client(), url);
    player.load().await.assert_success();
    let player = Arc::new(player);

    let playing = tokio::spawn({
        let player = player.clone();
        async move { player.play(&player.default_streams(), 0).await }
    });

    wait_for_state(&player, PlayerState::Playing).await;
    wait_for_chunk_requests(&server, 2).await;
    player.stop().assert_success();

    let report = playing.await.assert_success().assert_success();
    assert_eq!(player.state(), PlayerState::Loaded);
    assert_eq!(report.requested(), 2);
    for stream in report.streams.iter() {
        assert_eq!(stream.outcome, StreamOutcome::Cancelled { dispatched: 1 });
    }

    // a stopped player can play again
    let report = player.play(&[], 0).await.assert_success();
    assert!(report.streams.is_empty());
}

#[tokio::test]
async fn test_dropped_play_returns_to_loaded() {
    let server = MockServer::start().await;
    let url = server.mock_manifest("/asset.ism/Manifest", LONG_ISM).await;
    server.mock_chunks(r"^/asset\.ism/QualityLevels", 16).await;

    let mut player = Player::new(client(), url);
    player.load().await.assert_success();

    let streams = player.default_streams();
    tokio::time::timeout(Duration::from_millis(300), player.play(&streams, 0))
        .await
        .assert_error();
    assert_eq!(player.state(), PlayerState::Loaded);
    player.stop().assert_error();

    // the dropped session dispatches nothing more
    let requested = server.requested_paths().await.len();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.requested_paths().await.len(), requested);

    let report = player.play(&[], 0).await.assert_success();
    assert!(report.streams.is_empty());
}

#[tokio::test]
async fn test_parent_cancellation() {
    let server = MockServer::start().await;
    let url = server.mock_manifest("/asset.ism/Manifest", LONG_ISM).await;
    server.mock_chunks(r"^/asset\.ism/QualityLevels", 16).await;

    let parent = CancellationToken::new();
    let mut player = Player::new(client(), url).with_cancellation(parent.clone());
    player.load().await.assert_success();

    let streams = player.default_streams();
    let (report, ()) = tokio::join!(
        tokio::time::timeout(Duration::from_secs(5), player.play(&streams, 0)),
        async {
            wait_for_chunk_requests(&server, 2).await;
            parent.cancel();
        }
    );
    let report = report.assert_success().assert_success();
    assert_eq!(report.requested(), 2);
    assert_eq!(player.state(), PlayerState::Loaded);
}

#[tokio::test]
async fn test_abort_session_on_transport_error() {
    let server = MockServer::start().await;
    server.mock_chunks(r"^/audio/", 16).await;

    // nothing listens on port 1
    let mpd = format!(
        r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static">
  <Period>
    <AdaptationSet mimeType="video/mp4">
      <BaseURL>http://127.0.0.1:1/video/</BaseURL>
      <SegmentTemplate media="$Time$.m4s">
        <SegmentTimeline><S t="0" d="10" r="5"/></SegmentTimeline>
      </SegmentTemplate>
      <Representation id="v" bandwidth="1000000"/>
    </AdaptationSet>
    <AdaptationSet mimeType="audio/mp4">
      <BaseURL>{}/audio/</BaseURL>
      <SegmentTemplate media="$Time$.m4s">
        <SegmentTimeline><S t="0" d="10" r="5"/></SegmentTimeline>
      </SegmentTemplate>
      <Representation id="a" bandwidth="64000"/>
    </AdaptationSet>
  </Period>
</MPD>"#,
        server.uri()
    );
    let url = server.mock_manifest("/manifest.mpd", &mpd).await;

    let mut player = Player::new(client(), url).with_options(PlaybackOptions {
        failure_policy: FailurePolicy::AbortSession,
        ..Default::default()
    });
    player.load().await.assert_success();

    let result = tokio::time::timeout(
        Duration::from_secs(20),
        player.play(&player.default_streams(), 0),
    )
    .await
    .assert_success();
    match result {
        Err(OttError::ChunkFetchError { index, url, .. }) => {
            assert_eq!(index, 0);
            assert_eq!(url.as_str(), "http://127.0.0.1:1/video/0.m4s");
        }
        r => panic!("unexpected result {r:?}"),
    }
    assert_eq!(player.state(), PlayerState::Loaded);
}

#[tokio::test]
async fn test_stop_stream_on_transport_error() {
    let server = MockServer::start().await;
    server.mock_chunks(r"^/audio/", 16).await;

    let mpd = format!(
        r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static">
  <Period>
    <AdaptationSet mimeType="video/mp4">
      <BaseURL>http://127.0.0.1:1/video/</BaseURL>
      <SegmentTemplate timescale="1000" media="$Time$.m4s">
        <SegmentTimeline><S t="0" d="10" r="2"/></SegmentTimeline>
      </SegmentTemplate>
      <Representation id="v" bandwidth="1000000"/>
    </AdaptationSet>
    <AdaptationSet mimeType="audio/mp4">
      <BaseURL>{}/audio/</BaseURL>
      <SegmentTemplate timescale="1000" media="$Time$.m4s">
        <SegmentTimeline><S t="0" d="10" r="2"/></SegmentTimeline>
      </SegmentTemplate>
      <Representation id="a" bandwidth="64000"/>
    </AdaptationSet>
  </Period>
</MPD>"#,
        server.uri()
    );
    let url = server.mock_manifest("/manifest.mpd", &mpd).await;

    let mut player = Player::new(client(), url);
    player.load().await.assert_success();

    let report = tokio::time::timeout(
        Duration::from_secs(20),
        player.play(&player.default_streams(), 0),
    )
    .await
    .assert_success()
    .assert_success();

    let video = &report.streams[0];
    assert_eq!(video.failed, 1);
    assert_eq!(video.requested, 0);
    assert_eq!(video.outcome, StreamOutcome::Failed { dispatched: 1 });

    let audio = &report.streams[1];
    assert_eq!(audio.requested, 3);
    assert_eq!(audio.outcome, StreamOutcome::Completed { dispatched: 3 });
}

use std::time::{Duration, Instant};

use ottsim::{Player, Protocol, StreamType};
use wiremock::MockServer;

use crate::{client, AssertWrapper, OriginMock};

const ISM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<SmoothStreamingMedia MajorVersion="2" MinorVersion="2" TimeScale="1000" Duration="300">
  <StreamIndex Type="video" Name="video" Chunks="3" QualityLevels="2" Url="QualityLevels({bitrate})/Fragments(video={start time})">
    <QualityLevel Index="0" Bitrate="350000" FourCC="AVC1" MaxWidth="480" MaxHeight="270"/>
    <QualityLevel Index="1" Bitrate="2000000" FourCC="AVC1" MaxWidth="1280" MaxHeight="720"/>
    <c t="0" d="100"/>
    <c d="100"/>
    <c d="100"/>
  </StreamIndex>
  <StreamIndex Type="audio" Name="audio" Chunks="3" QualityLevels="1" Url="QualityLevels({bitrate})/Fragments(audio={start_time})">
    <QualityLevel Index="0" Bitrate="128000" FourCC="AACL" SamplingRate="48000" Channels="2"/>
    <c t="0" d="100" r="3"/>
  </StreamIndex>
  <StreamIndex Type="text" Name="textstream_eng" Language="eng" Url="QualityLevels({bitrate})/Fragments(textstream_eng={start time})">
    <QualityLevel Index="0" Bitrate="1000" FourCC="TTML"/>
    <c t="0" d="300"/>
  </StreamIndex>
</SmoothStreamingMedia>"#;

#[tokio::test]
async fn test_load_smooth() {
    let server = MockServer::start().await;
    let url = server.mock_manifest("/asset.ism/Manifest", ISM).await;

    let mut player = Player::new(client(), url);
    player.load().await.assert_success();
    assert_eq!(player.protocol(), Some(Protocol::Smooth));

    let summary: Vec<_> = player
        .streams()
        .iter()
        .map(|s| (s.stream_type(), s.bitrate(), s.chunks().len()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (StreamType::Video, 350_000, 3),
            (StreamType::Video, 2_000_000, 3),
            (StreamType::Audio, 128_000, 3),
            (StreamType::Text, 1_000, 1),
        ]
    );

    let video = &player.streams()[1];
    assert_eq!(video.duration(), Duration::from_millis(300));
    assert_eq!(
        video.chunks()[1].url.as_str(),
        format!(
            "{}/asset.ism/QualityLevels(2000000)/Fragments(video=100)",
            server.uri()
        )
    );
}

#[tokio::test]
async fn test_play_smooth_real_time() {
    let server = MockServer::start().await;
    let url = server.mock_manifest("/asset.ism/Manifest", ISM).await;
    server.mock_chunks(r"^/asset\.ism/QualityLevels\(\d+\)/Fragments\(.+\)$", 64).await;

    let mut player = Player::new(client(), url);
    player.load().await.assert_success();

    let started = Instant::now();
    let report = player
        .play(&player.default_streams(), 0)
        .await
        .assert_success();
    let elapsed = started.elapsed();

    // the third chunk waits for the first two to elapse
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");

    let requested: Vec<_> = report
        .streams
        .iter()
        .map(|s| (s.stream_type, s.bitrate, s.requested))
        .collect();
    assert_eq!(
        requested,
        vec![
            (StreamType::Video, 2_000_000, 3),
            (StreamType::Audio, 128_000, 3),
            (StreamType::Text, 1_000, 1),
        ]
    );
    assert_eq!(report.unsuccessful(), 0);
    assert_eq!(report.bytes(), 7 * 64);

    let paths = server.requested_paths().await;
    assert!(paths.contains(&"/asset.ism/QualityLevels(128000)/Fragments(audio=200)".to_string()));
    let text_chunk = "/asset.ism/QualityLevels(1000)/Fragments(textstream_eng=0)";
    assert!(paths.contains(&text_chunk.to_string()));
}

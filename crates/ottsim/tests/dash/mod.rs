use ottsim::{PlaybackOptions, Player, PlayerState, Protocol, StreamType};
use wiremock::MockServer;

use crate::{client, AssertWrapper, OriginMock};

const MPD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static" profiles="urn:mpeg:dash:profile:isoff-live:2011">
  <Period id="0">
    <AdaptationSet mimeType="video/mp4" segmentAlignment="true">
      <SegmentTemplate timescale="1000" media="video/$RepresentationID$/$Time$.m4s">
        <SegmentTimeline>
          <S t="0" d="100" r="2"/>
        </SegmentTimeline>
      </SegmentTemplate>
      <Representation id="sd" bandwidth="500000"/>
      <Representation id="hd" bandwidth="1000000"/>
    </AdaptationSet>
    <AdaptationSet mimeType="video/mp4">
      <EssentialProperty schemeIdUri="http://dashif.org/guide-lines/trickmode" value="1"/>
      <SegmentTemplate timescale="1000" media="trick/$Time$.m4s">
        <SegmentTimeline><S t="0" d="300"/></SegmentTimeline>
      </SegmentTemplate>
      <Representation id="trick" bandwidth="9000000"/>
    </AdaptationSet>
    <AdaptationSet mimeType="audio/mp4" lang="en">
      <SegmentTemplate timescale="48000" media="audio/$Bandwidth$/$Number$.m4s" startNumber="1">
        <SegmentTimeline>
          <S t="0" d="4800" r="2"/>
        </SegmentTimeline>
      </SegmentTemplate>
      <Representation id="a" bandwidth="128000"/>
    </AdaptationSet>
    <AdaptationSet mimeType="image/jpeg">
      <Representation id="thumbs" bandwidth="1000"/>
    </AdaptationSet>
  </Period>
</MPD>"#;

#[tokio::test]
async fn test_load_dash() {
    let server = MockServer::start().await;
    let url = server.mock_manifest("/vod/manifest.mpd", MPD).await;

    let mut player = Player::new(client(), url);
    player.load().await.assert_success();

    assert_eq!(player.state(), PlayerState::Loaded);
    assert_eq!(player.protocol(), Some(Protocol::Dash));

    let summary: Vec<_> = player
        .streams()
        .iter()
        .map(|s| (s.stream_type(), s.bitrate(), s.chunks().len()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (StreamType::Video, 500_000, 3),
            (StreamType::Video, 1_000_000, 3),
            (StreamType::Trickmode, 9_000_000, 1),
            (StreamType::Audio, 128_000, 3),
        ]
    );

    let defaults = player.default_streams();
    assert_eq!(defaults.len(), 2);
    assert_eq!(defaults[0].bitrate(), 1_000_000);
    assert_eq!(defaults[1].stream_type(), StreamType::Audio);
    assert_eq!(
        defaults[1].chunks()[2].url.as_str(),
        format!("{}/vod/audio/128000/3.m4s", server.uri())
    );
}

#[tokio::test]
async fn test_play_dash_burst() {
    let server = MockServer::start().await;
    let url = server.mock_manifest("/vod/manifest.mpd", MPD).await;
    server.mock_chunks(r"^/vod/video/.+\.m4s$", 1000).await;
    // audio chunks are not mounted and answered with 404

    let mut player = Player::new(client(), url).with_options(PlaybackOptions {
        real_time: false,
        ..Default::default()
    });
    player.load().await.assert_success();

    let report = player
        .play(&player.default_streams(), 0)
        .await
        .assert_success();
    assert_eq!(player.state(), PlayerState::Loaded);

    assert_eq!(report.streams.len(), 2);
    let video = &report.streams[0];
    assert_eq!(video.requested, 3);
    assert_eq!(video.unsuccessful, 0);
    assert_eq!(video.bytes, 3000);
    assert_eq!(video.outcome.dispatched(), 3);

    let audio = &report.streams[1];
    assert_eq!(audio.requested, 3);
    assert_eq!(audio.unsuccessful, 3);
    assert_eq!(report.unsuccessful(), 3);

    let mut video_paths: Vec<_> = server
        .requested_paths()
        .await
        .into_iter()
        .filter(|p| p.starts_with("/vod/video/"))
        .collect();
    video_paths.sort();
    assert_eq!(
        video_paths,
        vec![
            "/vod/video/hd/0.m4s",
            "/vod/video/hd/100.m4s",
            "/vod/video/hd/200.m4s",
        ]
    );
}

#[tokio::test]
async fn test_play_dash_from_position() {
    let server = MockServer::start().await;
    let url = server.mock_manifest("/vod/manifest.mpd", MPD).await;
    server.mock_chunks(r"^/vod/.+\.m4s$", 10).await;

    let mut player = Player::new(client(), url);
    player.load().await.assert_success();

    let hd: Vec<_> = player
        .streams()
        .iter()
        .filter(|s| s.bitrate() == 1_000_000)
        .cloned()
        .collect();
    let report = player.play(&hd, 2).await.assert_success();

    assert_eq!(report.requested(), 1);
    let chunk_paths: Vec<_> = server
        .requested_paths()
        .await
        .into_iter()
        .filter(|p| p.ends_with(".m4s"))
        .collect();
    assert_eq!(chunk_paths, vec!["/vod/video/hd/200.m4s"]);
}

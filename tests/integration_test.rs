use quizbox::broadcast;
use quizbox::engine::{Event, GameEngine};
use quizbox::protocol::{ClientMessage, ServerMessage};
use quizbox::supplier::FallbackSupplier;
use quizbox::transport::local::LocalBus;
use quizbox::transport::PeerEvent;
use quizbox::types::{GameConfig, GamePhase};
use std::sync::Arc;

fn small_config() -> GameConfig {
    GameConfig {
        total_levels: 2,
        questions_per_level: 2,
        blitz_question_count: 3,
        continue_debounce_ms: 0,
        ..GameConfig::default()
    }
}

fn new_engine(config: GameConfig) -> Arc<GameEngine> {
    let bus = Arc::new(LocalBus::new("ROOM1"));
    GameEngine::new(config, Arc::new(FallbackSupplier::new()), bus)
}

async fn send(engine: &Arc<GameEngine>, peer: &str, message: ClientMessage) {
    engine
        .dispatch(Event::Peer(PeerEvent::Message {
            peer: peer.to_string(),
            message,
        }))
        .await;
}

async fn join(engine: &Arc<GameEngine>, id: &str, name: &str) {
    send(
        engine,
        id,
        ClientMessage::Join {
            id: id.to_string(),
            name: name.to_string(),
            avatar: "🦊".to_string(),
        },
    )
    .await;
}

/// Resolve the pending countdown the way the timer task would.
async fn expire_timer(engine: &Arc<GameEngine>, phase: GamePhase) {
    let generation = engine.timer().current_generation();
    engine
        .dispatch(Event::TimerExpired { phase, generation })
        .await;
}

/// Play every question of the current level: p1 answers correctly, p2
/// answers wrong. Returns how many questions were played.
async fn play_out_level(engine: &Arc<GameEngine>) -> usize {
    let total = engine.snapshot().await.total_questions_in_level;
    for i in 0..total {
        let state = engine.snapshot().await;
        assert_eq!(state.phase, GamePhase::Question);
        assert_eq!(state.current_question_index, i);

        let question = state.current_question.expect("question should be set");
        let wrong = (question.correct_index + 1) % question.options.len();
        send(
            engine,
            "p1",
            ClientMessage::SubmitAnswer {
                answer_index: question.correct_index,
            },
        )
        .await;
        send(engine, "p2", ClientMessage::SubmitAnswer { answer_index: wrong }).await;

        expire_timer(engine, GamePhase::Question).await;
        assert_eq!(engine.snapshot().await.phase, GamePhase::AnswersReveal);

        send(engine, "p1", ClientMessage::RequestNextStep).await;
    }
    total
}

/// End-to-end flow: lobby through two regular levels, the blitz level and
/// game over, with scoring checked along the way.
#[tokio::test]
async fn test_full_game_flow() {
    let engine = new_engine(small_config());

    // 1. Lobby: two players join
    join(&engine, "p1", "Alice").await;
    join(&engine, "p2", "Bob").await;
    let state = engine.snapshot().await;
    assert_eq!(state.phase, GamePhase::Lobby);
    assert_eq!(state.players.len(), 2);

    // 2. Host starts the game: category selection with a live countdown
    engine.start_game().await.expect("start should succeed");
    let state = engine.snapshot().await;
    assert_eq!(state.phase, GamePhase::CategorySelection);
    assert!(!state.available_categories.is_empty());
    assert_eq!(state.time_remaining, engine.config().category_vote_seconds);

    // 3. Players vote; the countdown expiring resolves the vote and loads
    //    the first question
    let category = state.available_categories[0].clone();
    send(
        &engine,
        "p1",
        ClientMessage::VoteCategory {
            category: category.clone(),
        },
    )
    .await;
    send(&engine, "p2", ClientMessage::VoteCategory { category }).await;
    expire_timer(&engine, GamePhase::CategorySelection).await;

    let state = engine.snapshot().await;
    assert_eq!(state.phase, GamePhase::Question);
    assert_eq!(state.current_level, 1);

    // 4. Level 1: p1 answers everything right, p2 everything wrong
    let played = play_out_level(&engine).await;
    assert!(played > 0);
    let state = engine.snapshot().await;
    assert_eq!(state.phase, GamePhase::LevelComplete);
    let expected_p1 = played as u32 * engine.config().points_correct;
    assert_eq!(state.player("p1").unwrap().score, expected_p1);
    assert_eq!(state.player("p2").unwrap().score, 0);

    // 5. Continue into level 2: a fresh category vote
    send(&engine, "p1", ClientMessage::RequestNextStep).await;
    let state = engine.snapshot().await;
    assert_eq!(state.phase, GamePhase::CategorySelection);
    assert_eq!(state.current_level, 2);
    // Votes from the previous level were cleared
    for player in &state.players {
        assert_eq!(player.selected_category, None);
    }

    // Nobody votes this time; expiry still resolves to some category.
    expire_timer(&engine, GamePhase::CategorySelection).await;
    assert_eq!(engine.snapshot().await.phase, GamePhase::Question);
    let played_level2 = play_out_level(&engine).await;

    // 6. Continue past the last regular level: blitz, no category vote
    send(&engine, "p1", ClientMessage::RequestNextStep).await;
    let state = engine.snapshot().await;
    assert_eq!(state.phase, GamePhase::Question);
    assert!(state.in_blitz_level());
    assert!(state.available_categories.is_empty());
    let played_blitz = play_out_level(&engine).await;

    // 7. Continue from the blitz level: game over with the right winner
    send(&engine, "p1", ClientMessage::RequestNextStep).await;
    let state = engine.snapshot().await;
    assert_eq!(state.phase, GamePhase::GameOver);
    assert_eq!(state.winner_id.as_deref(), Some("p1"));

    let total_correct = (played + played_level2 + played_blitz) as u32;
    assert_eq!(
        state.player("p1").unwrap().score,
        total_correct * engine.config().points_correct
    );
    assert_eq!(state.player("p2").unwrap().score, 0);

    // 8. Terminal phase: further actions are dropped
    send(&engine, "p1", ClientMessage::RequestNextStep).await;
    send(&engine, "p2", ClientMessage::SubmitAnswer { answer_index: 0 }).await;
    assert_eq!(engine.snapshot().await.phase, GamePhase::GameOver);

    engine.shutdown();
}

/// A rejoin with a known id mid-game refreshes the profile and keeps the
/// score; it never creates a second player.
#[tokio::test]
async fn test_reconnect_mid_game_preserves_score() {
    let engine = new_engine(small_config());
    join(&engine, "p1", "Alice").await;
    join(&engine, "p2", "Bob").await;
    engine.start_game().await.unwrap();
    expire_timer(&engine, GamePhase::CategorySelection).await;

    // Score a question for p1, then drop the connection.
    let correct = engine
        .snapshot()
        .await
        .current_question
        .unwrap()
        .correct_index;
    send(&engine, "p1", ClientMessage::SubmitAnswer { answer_index: correct }).await;
    expire_timer(&engine, GamePhase::Question).await;
    engine
        .dispatch(Event::Peer(PeerEvent::Disconnected {
            peer: "p1".to_string(),
        }))
        .await;

    let state = engine.snapshot().await;
    let before = state.player("p1").unwrap();
    assert!(!before.connected);
    let score_before = before.score;
    assert!(score_before > 0);

    // Rejoin under a new name on a new device.
    join(&engine, "p1", "Alice2").await;
    let state = engine.snapshot().await;
    assert_eq!(state.players.len(), 2);
    let after = state.player("p1").unwrap();
    assert!(after.connected);
    assert_eq!(after.name, "Alice2");
    assert_eq!(after.score, score_before);

    engine.shutdown();
}

/// The lobby admits players up to the configured cap; leaving frees a slot.
#[tokio::test]
async fn test_lobby_capacity_and_slot_reuse() {
    let config = GameConfig {
        max_players: 2,
        ..small_config()
    };
    let engine = new_engine(config);

    join(&engine, "p1", "Alice").await;
    join(&engine, "p2", "Bob").await;
    join(&engine, "p3", "Carol").await;
    let state = engine.snapshot().await;
    assert_eq!(state.players.len(), 2);
    assert!(state.player("p3").is_none());

    // A lobby departure removes the player entirely, freeing the slot.
    engine
        .dispatch(Event::Peer(PeerEvent::Disconnected {
            peer: "p2".to_string(),
        }))
        .await;
    join(&engine, "p3", "Carol").await;
    let state = engine.snapshot().await;
    assert_eq!(state.players.len(), 2);
    assert!(state.player("p3").is_some());

    engine.shutdown();
}

/// Full transport loop: peers on the local bus see eager snapshots for
/// their own actions via the event pump, without polling the engine.
#[tokio::test]
async fn test_peers_observe_state_through_the_bus() {
    let bus = Arc::new(LocalBus::new("ROOM1"));
    let engine = GameEngine::new(
        small_config(),
        Arc::new(FallbackSupplier::new()),
        bus.clone(),
    );
    broadcast::spawn_event_pump(engine.clone());

    let mut peer = bus.connect("p1");
    peer.send(ClientMessage::Join {
        id: "p1".to_string(),
        name: "Alice".to_string(),
        avatar: "🐸".to_string(),
    });

    let deadline = tokio::time::Duration::from_secs(2);
    let state = tokio::time::timeout(deadline, async {
        loop {
            match peer.recv().await {
                Some(ServerMessage::StateUpdate { state })
                    if state.player("p1").is_some() =>
                {
                    return state;
                }
                Some(_) => continue,
                None => panic!("bus closed early"),
            }
        }
    })
    .await
    .expect("snapshot with joined player");

    assert_eq!(state.phase, GamePhase::Lobby);
    assert_eq!(state.player("p1").unwrap().avatar, "🐸");

    // A state probe also gets answered with a snapshot.
    peer.send(ClientMessage::RequestState);
    let probe = tokio::time::timeout(deadline, peer.recv())
        .await
        .expect("probe response");
    assert!(matches!(probe, Some(ServerMessage::StateUpdate { .. })));

    engine.shutdown();
}

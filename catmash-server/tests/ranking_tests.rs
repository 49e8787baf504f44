//! Ranking and statistics tests

mod helpers;

use catmash_common::VoteMode;
use catmash_server::db::{candidates, votes};
use catmash_server::services::{DirectVoting, RankingService};
use helpers::{create_test_db, engine, seed_candidates};
use uuid::Uuid;

#[tokio::test]
async fn test_full_ranking_breaks_ties_by_insertion_order() {
    let (_dir, pool) = create_test_db().await;
    let cats = seed_candidates(&pool, 4).await;
    let voting = DirectVoting::new(pool.clone());

    // cats[1] and cats[3] tie on 2, cats[0] and cats[2] tie on 0
    for cat in [&cats[1], &cats[3]] {
        voting.vote_direct(Uuid::new_v4(), cat.id).await.unwrap();
        voting.vote_direct(Uuid::new_v4(), cat.id).await.unwrap();
    }

    let ranking = RankingService::new(pool.clone()).full_ranking().await.unwrap();
    let ids: Vec<Uuid> = ranking.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![cats[1].id, cats[3].id, cats[0].id, cats[2].id]);
}

#[tokio::test]
async fn test_full_ranking_hides_removed_candidates() {
    let (_dir, pool) = create_test_db().await;
    let cats = seed_candidates(&pool, 3).await;
    DirectVoting::new(pool.clone())
        .vote_direct(Uuid::new_v4(), cats[0].id)
        .await
        .unwrap();
    candidates::soft_delete(&pool, cats[0].id).await.unwrap();

    let ranking = RankingService::new(pool.clone()).full_ranking().await.unwrap();
    assert_eq!(ranking.len(), 2);
    assert!(ranking.iter().all(|c| c.id != cats[0].id));
}

#[tokio::test]
async fn test_global_stats() {
    let (_dir, pool) = create_test_db().await;
    let cats = seed_candidates(&pool, 5).await;
    let voting = DirectVoting::new(pool.clone());

    for (i, cat) in cats.iter().enumerate() {
        for _ in 0..i {
            voting.vote_direct(Uuid::new_v4(), cat.id).await.unwrap();
        }
    }

    let stats = RankingService::new(pool.clone()).global_stats().await.unwrap();
    assert_eq!(stats.total_cats, 5);
    assert_eq!(stats.total_votes, 10);
    assert_eq!(stats.recent_votes, 10);
    let top: Vec<Uuid> = stats.top_cats.iter().map(|c| c.id).collect();
    assert_eq!(top, vec![cats[4].id, cats[3].id, cats[2].id]);
}

#[tokio::test]
async fn test_global_stats_on_empty_store() {
    let (_dir, pool) = create_test_db().await;
    let stats = RankingService::new(pool).global_stats().await.unwrap();
    assert_eq!(stats.total_cats, 0);
    assert_eq!(stats.total_votes, 0);
    assert!(stats.top_cats.is_empty());
}

#[tokio::test]
async fn test_favourites_follow_global_popularity() {
    let (_dir, pool) = create_test_db().await;
    let cats = seed_candidates(&pool, 5).await;
    let voting = DirectVoting::new(pool.clone());
    let voter = Uuid::new_v4();

    // The voter likes cats 0..4; the crowd prefers 3, then 1, then 2
    for cat in &cats[..4] {
        voting.vote_direct(voter, cat.id).await.unwrap();
    }
    for (index, extra) in [(3, 3), (1, 2), (2, 1)] {
        for _ in 0..extra {
            voting.vote_direct(Uuid::new_v4(), cats[index].id).await.unwrap();
        }
    }

    let history = RankingService::new(pool.clone()).user_history(voter).await.unwrap();
    let favourites: Vec<Uuid> = history.favorite_cats.iter().map(|c| c.id).collect();
    assert_eq!(favourites, vec![cats[3].id, cats[1].id, cats[2].id]);
    assert_eq!(history.total_votes, 4);
    assert_eq!(history.stats.total_voted, 4);
    assert_eq!(history.stats.voting_rate, 80);
}

#[tokio::test]
async fn test_user_history_for_new_voter() {
    let (_dir, pool) = create_test_db().await;
    seed_candidates(&pool, 3).await;

    let history = RankingService::new(pool).user_history(Uuid::new_v4()).await.unwrap();
    assert!(history.votes.is_empty());
    assert_eq!(history.total_votes, 0);
    assert!(history.favorite_cats.is_empty());
    assert_eq!(history.total_tournaments_played, 0);
    assert_eq!(history.best_streak, 0);
    assert_eq!(history.stats.voting_rate, 0);
}

#[tokio::test]
async fn test_user_history_tracks_tournaments() {
    let (_dir, pool) = create_test_db().await;
    seed_candidates(&pool, 4).await;
    let engine = engine(&pool, 21);
    let voter = Uuid::new_v4();

    // First session: two votes then abandon via restart
    let pair = engine.start_tournament(voter).await.unwrap();
    let first = engine.vote(voter, pair.champion.id).await.unwrap();
    engine.vote(voter, first.winner.id).await.unwrap();

    // Second session: ended after no votes
    engine.start_tournament(voter).await.unwrap();
    engine.end(voter).await.unwrap();

    let history = RankingService::new(pool.clone()).user_history(voter).await.unwrap();
    assert_eq!(history.total_tournaments_played, 2);
    assert_eq!(history.best_streak, 2);
    assert_eq!(history.total_votes, 2);
    assert!(history.votes.iter().all(|v| v.vote.mode == VoteMode::Tournament));
    assert_eq!(
        votes::count(&pool).await.unwrap(),
        history.total_votes
    );
}

#[tokio::test]
async fn test_total_voted_counts_distinct_active_candidates() {
    let (_dir, pool) = create_test_db().await;
    let cats = seed_candidates(&pool, 4).await;
    let voter = Uuid::new_v4();

    votes::record(&pool, cats[0].id, voter, VoteMode::Tournament).await.unwrap();
    votes::record(&pool, cats[0].id, voter, VoteMode::Tournament).await.unwrap();
    votes::record(&pool, cats[1].id, voter, VoteMode::Direct).await.unwrap();

    let ranking = RankingService::new(pool.clone());
    let history = ranking.user_history(voter).await.unwrap();
    assert_eq!(history.total_votes, 3);
    assert_eq!(history.stats.total_voted, 2);
    assert_eq!(history.stats.voting_rate, 50);

    candidates::soft_delete(&pool, cats[1].id).await.unwrap();
    let history = ranking.user_history(voter).await.unwrap();
    assert_eq!(history.total_votes, 3);
    assert_eq!(history.stats.total_voted, 1);
}

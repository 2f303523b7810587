//! Behavioural tests run against both storage backends

mod common;

use aipr_common::config::StorageBackend;
use aipr_common::models::{RankingPeriod, ToolStatus};
use aipr_common::Error;
use aipr_rank::open_repositories;
use common::{all_backends, article, entry, period, tool, utc};
use serde_json::Value;
use tempfile::TempDir;

#[tokio::test]
async fn test_tool_crud_and_lookups() {
    for backend in all_backends().await {
        let tools = &backend.repos.tools;
        tools.upsert(tool("cursor", "Cursor", "code-editor")).await.unwrap();
        tools.upsert(tool("aider", "Aider", "open-source-framework")).await.unwrap();
        let mut devin = tool("devin", "Devin", "autonomous-agent");
        devin.status = ToolStatus::Beta;
        devin.info.summary = "An autonomous software engineer".to_string();
        tools.upsert(devin).await.unwrap();

        let names: Vec<String> = tools.get_all().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Aider", "Cursor", "Devin"], "{}", backend.name);

        assert_eq!(tools.get_by_slug("cursor").await.unwrap().unwrap().id, "cursor");
        assert!(tools.get_by_id("missing").await.unwrap().is_none());
        assert_eq!(tools.get_by_category("code-editor").await.unwrap().len(), 1);
        assert_eq!(tools.get_by_status(ToolStatus::Active).await.unwrap().len(), 2);

        let found = tools.search("SOFTWARE engineer").await.unwrap();
        assert_eq!(found.len(), 1, "{}", backend.name);
        assert_eq!(found[0].id, "devin");

        let categories = tools.categories_with_counts().await.unwrap();
        assert_eq!(categories.len(), 3);
        assert_eq!(categories[0], ("autonomous-agent".to_string(), 1));

        assert!(tools.delete("aider").await.unwrap());
        assert!(!tools.delete("aider").await.unwrap());
        assert_eq!(tools.get_all().await.unwrap().len(), 2);
    }
}

#[tokio::test]
async fn test_tool_slug_conflict() {
    for backend in all_backends().await {
        let tools = &backend.repos.tools;
        tools.upsert(tool("cursor", "Cursor", "code-editor")).await.unwrap();

        let mut impostor = tool("other", "Other", "code-editor");
        impostor.slug = "cursor".to_string();
        let err = tools.upsert(impostor).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "{}: {:?}", backend.name, err);

        // Updating the owner itself is fine
        let mut renamed = tool("cursor", "Cursor IDE", "code-editor");
        renamed.info.website = "https://cursor.com".to_string();
        tools.upsert(renamed).await.unwrap();
        assert_eq!(tools.get_by_id("cursor").await.unwrap().unwrap().name, "Cursor IDE");
    }
}

#[tokio::test]
async fn test_news_queries() {
    for backend in all_backends().await {
        let news = &backend.repos.news;
        let mut tagged = article("n1", utc(2025, 5, 20), &["cursor"]);
        tagged.tags = vec!["Funding".to_string()];
        tagged.content = "Cursor raised a big round.".to_string();
        news.upsert(tagged).await.unwrap();
        news.upsert(article("n2", utc(2025, 6, 2), &["cursor", "devin"])).await.unwrap();
        news.upsert(article("n3", utc(2025, 6, 10), &["devin"])).await.unwrap();

        let all: Vec<String> = news.get_all().await.unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(all, vec!["n3", "n2", "n1"], "{}", backend.name);

        let june: Vec<String> = news
            .get_by_month("2025-06")
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(june, vec!["n3", "n2"], "{}", backend.name);
        assert!(news.get_by_month("June").await.is_err());

        assert_eq!(news.get_by_tool_mention("cursor").await.unwrap().len(), 2);
        assert_eq!(news.get_by_tag("funding").await.unwrap().len(), 1, "{}", backend.name);
        assert_eq!(news.search("BIG ROUND").await.unwrap()[0].id, "n1");
        assert_eq!(news.get_recent(1).await.unwrap()[0].id, "n3");
        assert_eq!(news.get_by_slug("n2-slug").await.unwrap().unwrap().id, "n2");

        let page = news.get_paginated(2, 2).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "n1");

        assert!(news.delete("n2").await.unwrap());
        assert_eq!(news.get_by_tool_mention("cursor").await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_news_slug_conflict() {
    for backend in all_backends().await {
        let news = &backend.repos.news;
        news.upsert(article("n1", utc(2025, 5, 20), &[])).await.unwrap();
        let mut clash = article("n2", utc(2025, 5, 21), &[]);
        clash.slug = "n1-slug".to_string();
        let err = news.upsert(clash).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "{}", backend.name);
    }
}

#[tokio::test]
async fn test_rankings_current_pointer() {
    for backend in all_backends().await {
        let rankings = &backend.repos.rankings;
        rankings.save_period(period("2025-05", vec![entry("a", 1, 80.0)], true)).await.unwrap();
        rankings.save_period(period("2025-06", vec![entry("a", 1, 82.0)], false)).await.unwrap();

        assert_eq!(rankings.get_periods().await.unwrap(), vec!["2025-06", "2025-05"]);
        assert_eq!(rankings.get_current_period().await.unwrap().as_deref(), Some("2025-05"));
        assert!(!rankings.get_period("2025-06").await.unwrap().unwrap().is_current);

        // Re-saving the current period keeps it current
        rankings.save_period(period("2025-05", vec![entry("a", 1, 81.0)], false)).await.unwrap();
        assert_eq!(rankings.get_current_period().await.unwrap().as_deref(), Some("2025-05"));

        rankings.set_current_period("2025-06").await.unwrap();
        let current = rankings.get_current_rankings().await.unwrap().unwrap();
        assert_eq!(current.period, "2025-06");
        assert!(current.is_current);
        assert!(!rankings.get_period("2025-05").await.unwrap().unwrap().is_current);

        let err = rankings.set_current_period("2024-01").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "{}", backend.name);
    }
}

#[tokio::test]
async fn test_deleting_current_period_promotes_newest() {
    for backend in all_backends().await {
        let rankings = &backend.repos.rankings;
        rankings.save_period(period("2025-04", vec![], false)).await.unwrap();
        rankings.save_period(period("2025-05", vec![], false)).await.unwrap();
        rankings.save_period(period("2025-06", vec![], true)).await.unwrap();

        assert!(rankings.delete_period("2025-06").await.unwrap());
        assert!(!rankings.delete_period("2025-06").await.unwrap());
        assert_eq!(
            rankings.get_current_period().await.unwrap().as_deref(),
            Some("2025-05"),
            "{}",
            backend.name
        );
        assert_eq!(rankings.get_periods().await.unwrap(), vec!["2025-05", "2025-04"]);
    }
}

#[tokio::test]
async fn test_rename_period() {
    for backend in all_backends().await {
        let rankings = &backend.repos.rankings;
        rankings.save_period(period("2025-06", vec![entry("a", 1, 80.0)], true)).await.unwrap();
        rankings.save_period(period("2025-07", vec![], false)).await.unwrap();

        assert!(rankings.rename_period("2025-06", "2025-06-15").await.unwrap());
        assert!(!rankings.rename_period("2025-01", "2025-02").await.unwrap());
        let err = rankings.rename_period("2025-06-15", "2025-07").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "{}", backend.name);

        let renamed = rankings.get_period("2025-06-15").await.unwrap().unwrap();
        assert_eq!(renamed.period, "2025-06-15");
        assert_eq!(renamed.rankings.len(), 1);
        assert_eq!(
            rankings.get_current_period().await.unwrap().as_deref(),
            Some("2025-06-15")
        );
        assert!(rankings.get_period("2025-06").await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_json_documents_survive_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let repos = open_repositories(aipr_common::config::StorageBackend::Json, dir.path())
            .await
            .unwrap();
        repos.tools.upsert(tool("cursor", "Cursor", "code-editor")).await.unwrap();
        repos.news.upsert(article("n1", utc(2025, 6, 1), &["cursor"])).await.unwrap();
        repos
            .rankings
            .save_period(period("2025-06", vec![entry("cursor", 1, 80.0)], true))
            .await
            .unwrap();
    }

    let root = dir.path().join("json");
    assert!(root.join("tools/individual/cursor.json").exists());
    assert!(root.join("tools/tools-index.json").exists());
    assert!(root.join("news/news.json").exists());
    assert!(root.join("rankings/periods/2025-06.json").exists());

    let repos = open_repositories(aipr_common::config::StorageBackend::Json, dir.path())
        .await
        .unwrap();
    assert_eq!(repos.tools.get_all().await.unwrap().len(), 1);
    assert_eq!(repos.news.get_by_tool_mention("cursor").await.unwrap().len(), 1);
    assert_eq!(
        repos.rankings.get_current_period().await.unwrap().as_deref(),
        Some("2025-06")
    );
}

#[tokio::test]
async fn test_sqlite_documents_survive_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let repos = open_repositories(aipr_common::config::StorageBackend::Sqlite, dir.path())
            .await
            .unwrap();
        repos.tools.upsert(tool("cursor", "Cursor", "code-editor")).await.unwrap();
    }
    assert!(dir.path().join("aipr.db").exists());

    let repos = open_repositories(aipr_common::config::StorageBackend::Sqlite, dir.path())
        .await
        .unwrap();
    assert_eq!(repos.tools.get_by_slug("cursor").await.unwrap().unwrap().name, "Cursor");
}

#[tokio::test]
async fn test_search_folds_non_ascii_case() {
    for backend in all_backends().await {
        let tools = &backend.repos.tools;
        let mut editor = tool("editeur", "Éditeur Pro", "code-editor");
        editor.info.description = "Ein Werkzeug für ÜBERSETZUNGEN".to_string();
        tools.upsert(editor).await.unwrap();
        tools.upsert(tool("cursor", "Cursor", "code-editor")).await.unwrap();

        let found = tools.search("éditeur").await.unwrap();
        assert_eq!(found.len(), 1, "{}", backend.name);
        assert_eq!(tools.search("übersetzungen").await.unwrap().len(), 1, "{}", backend.name);

        let news = &backend.repos.news;
        let mut story = article("n1", utc(2025, 6, 1), &[]);
        story.title = "Über-Agent ships".to_string();
        story.tags = vec!["Ökosystem".to_string()];
        news.upsert(story).await.unwrap();
        assert_eq!(news.search("ÜBER-AGENT").await.unwrap().len(), 1, "{}", backend.name);
        assert_eq!(news.get_by_tag("ökosystem").await.unwrap().len(), 1, "{}", backend.name);
    }
}

#[tokio::test]
async fn test_unsafe_tool_slugs_rejected_everywhere() {
    for backend in all_backends().await {
        let tools = &backend.repos.tools;
        for slug in ["../escape", "a/b", "a\\b", ""] {
            let mut bad = tool("bad", "Bad", "code-editor");
            bad.slug = slug.to_string();
            let err = tools.upsert(bad).await.unwrap_err();
            assert!(
                matches!(err, Error::InvalidInput(_)),
                "{} accepted {:?}: {:?}",
                backend.name,
                slug,
                err
            );
        }
        assert!(tools.get_all().await.unwrap().is_empty(), "{}", backend.name);
    }
}

#[tokio::test]
async fn test_json_period_files_keep_backups() {
    let dir = TempDir::new().unwrap();
    let repos = open_repositories(StorageBackend::Json, dir.path()).await.unwrap();
    let periods = dir.path().join("json/rankings/periods");
    let file = periods.join("2025-06.json");
    let backup = periods.join("2025-06.json.backup");
    let deleted = periods.join("2025-06.json.deleted.backup");

    repos
        .rankings
        .save_period(period("2025-06", vec![entry("cursor", 1, 80.0)], true))
        .await
        .unwrap();
    assert!(!backup.exists());

    repos
        .rankings
        .save_period(period("2025-06", vec![entry("cursor", 1, 85.0)], true))
        .await
        .unwrap();
    let saved: RankingPeriod =
        serde_json::from_str(&std::fs::read_to_string(&backup).unwrap()).unwrap();
    assert_eq!(saved.rankings[0].score, 80.0);
    let live: RankingPeriod = serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
    assert_eq!(live.rankings[0].score, 85.0);

    assert!(repos.rankings.delete_period("2025-06").await.unwrap());
    assert!(!file.exists());
    assert!(!backup.exists());
    let removed: RankingPeriod =
        serde_json::from_str(&std::fs::read_to_string(&deleted).unwrap()).unwrap();
    assert_eq!(removed.rankings[0].score, 85.0);
}

#[tokio::test]
async fn test_json_tools_index_rebuilt_when_missing_or_stale() {
    let dir = TempDir::new().unwrap();
    let tools_dir = dir.path().join("json/tools");
    let index_path = tools_dir.join("tools-index.json");
    {
        let repos = open_repositories(StorageBackend::Json, dir.path()).await.unwrap();
        repos.tools.upsert(tool("cursor", "Cursor", "code-editor")).await.unwrap();
        repos.tools.upsert(tool("devin", "Devin", "autonomous-agent")).await.unwrap();
    }

    std::fs::remove_file(&index_path).unwrap();
    {
        let repos = open_repositories(StorageBackend::Json, dir.path()).await.unwrap();
        assert_eq!(repos.tools.get_all().await.unwrap().len(), 2);
    }
    let index: Value = serde_json::from_str(&std::fs::read_to_string(&index_path).unwrap()).unwrap();
    assert_eq!(index["by_slug"]["devin"], "devin");

    // A file dropped in by hand makes the index stale
    let aider = tool("aider", "Aider", "open-source-framework");
    std::fs::write(
        tools_dir.join("individual/aider.json"),
        serde_json::to_string_pretty(&aider).unwrap(),
    )
    .unwrap();

    let repos = open_repositories(StorageBackend::Json, dir.path()).await.unwrap();
    let names: Vec<String> = repos.tools.get_all().await.unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["Aider", "Cursor", "Devin"]);
    assert_eq!(
        repos.tools.get_by_category("open-source-framework").await.unwrap()[0].id,
        "aider"
    );
    let index: Value = serde_json::from_str(&std::fs::read_to_string(&index_path).unwrap()).unwrap();
    assert_eq!(index["by_id"]["aider"], "aider");
    assert_eq!(index["by_category"]["code-editor"], serde_json::json!(["cursor"]));
}

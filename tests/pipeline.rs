use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use legalrag::language::contains_arabic;
use legalrag::{
    Article, Assistant, AssistantConfig, Language, LlmProvider, Outcome, PipelineError,
    ProviderRequest, QueryEncoder, ServiceError, Stage, VectorStore,
};

const DIMS: usize = 8;

#[derive(Default)]
struct Calls {
    embedded: Vec<String>,
    searches: usize,
    completions: Vec<(String, String)>,
}

type SharedCalls = Arc<Mutex<Calls>>;

struct FakeEncoder {
    calls: SharedCalls,
    dims: usize,
    fail: Option<fn() -> ServiceError>,
}

impl QueryEncoder for FakeEncoder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.calls.lock().unwrap().embedded.push(text.to_string());
        if let Some(fail) = self.fail {
            return Err(fail());
        }
        let seed = text.chars().count() as f32;
        Ok((0..self.dims).map(|i| seed + i as f32).collect())
    }

    fn model_name(&self) -> &str {
        "fake-embedding"
    }
}

struct FakeStore {
    calls: SharedCalls,
    rows: Vec<Article>,
}

impl VectorStore for FakeStore {
    fn nearest(&self, _vector: &[f32], limit: usize) -> Result<Vec<Article>, ServiceError> {
        self.calls.lock().unwrap().searches += 1;
        Ok(self.rows.iter().take(limit).cloned().collect())
    }

    fn index_dimensions(&self) -> Option<usize> {
        Some(DIMS)
    }

    fn backend(&self) -> &'static str {
        "fake"
    }
}

/// Replays scripted replies in order; records every request.
struct ScriptedProvider {
    calls: SharedCalls,
    replies: Mutex<VecDeque<Result<String, ServiceError>>>,
}

impl LlmProvider for ScriptedProvider {
    fn answer(&self, request: &ProviderRequest) -> Result<String, ServiceError> {
        self.calls
            .lock()
            .unwrap()
            .completions
            .push((request.system.to_string(), request.user.to_string()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Malformed("no scripted reply".into())))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct Harness {
    calls: SharedCalls,
    rows: Vec<Article>,
    replies: Vec<Result<String, ServiceError>>,
    encoder_dims: usize,
    encoder_fail: Option<fn() -> ServiceError>,
    config: AssistantConfig,
}

impl Harness {
    fn new(rows: Vec<Article>) -> Self {
        Self {
            calls: SharedCalls::default(),
            rows,
            replies: Vec::new(),
            encoder_dims: DIMS,
            encoder_fail: None,
            config: AssistantConfig::default(),
        }
    }

    fn reply(mut self, reply: Result<&str, ServiceError>) -> Self {
        self.replies.push(reply.map(str::to_string));
        self
    }

    fn build(self) -> (Assistant, SharedCalls) {
        let calls = self.calls;
        let assistant = Assistant::new(
            Box::new(FakeEncoder {
                calls: Arc::clone(&calls),
                dims: self.encoder_dims,
                fail: self.encoder_fail,
            }),
            Box::new(FakeStore {
                calls: Arc::clone(&calls),
                rows: self.rows,
            }),
            Box::new(ScriptedProvider {
                calls: Arc::clone(&calls),
                replies: Mutex::new(self.replies.into()),
            }),
            self.config,
        );
        (assistant, calls)
    }
}

fn metadata_record() -> Article {
    Article::new("Law No. 30 of 1952 as amended.")
        .with_title("LAW METADATA")
        .with_law("Evidence Law")
}

fn article(number: &str, title: &str, text: &str) -> Article {
    Article::new(text)
        .with_number(number)
        .with_title(title)
        .with_law("Evidence Law")
}

fn amendment_pair() -> Vec<Article> {
    vec![
        article(
            "8",
            "نص المادة 8 بعد التعديل",
            "تقبل الشهادة في الالتزامات التي لا تزيد قيمتها على مائة دينار.",
        ),
        metadata_record(),
        article(
            "8",
            "نص المادة 8 الأصلي",
            "تقبل الشهادة في الالتزامات التي لا تزيد قيمتها على عشرة دنانير.",
        ),
    ]
}

#[test]
fn amendment_question_is_answered_from_both_versions() {
    let (assistant, calls) = Harness::new(amendment_pair())
        .reply(Ok(
            "  رُفع الحد من عشرة دنانير (قبل التعديل) إلى مائة دينار (بعد التعديل).  \n",
        ))
        .build();

    let outcome = assistant.ask("ما التعديل الذي جرى على المادة 8؟").unwrap();
    let Outcome::Answered(answer) = outcome else {
        panic!("expected an answer");
    };
    assert_eq!(
        answer.answer,
        "رُفع الحد من عشرة دنانير (قبل التعديل) إلى مائة دينار (بعد التعديل)."
    );
    assert_eq!(answer.language, Language::Arabic);
    assert_eq!(answer.articles.len(), 2);
    assert!(answer.articles.iter().all(|a| !a.is_law_metadata()));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.completions.len(), 1);
    let (system, user) = &calls.completions[0];
    assert!(user.is_empty());
    let amended = system.find("نص المادة 8 بعد التعديل").unwrap();
    let original = system.find("نص المادة 8 الأصلي").unwrap();
    assert!(amended < original, "retrieval order must be preserved");
    assert!(system.contains("amended version as the one currently in force"));
    assert!(system.contains("Answer in Arabic"));
    assert!(!system.contains("LAW METADATA"));
}

#[test]
fn empty_retrieval_skips_generation() {
    let (assistant, calls) = Harness::new(Vec::new()).reply(Ok("unused")).build();
    let outcome = assistant.ask("What does article 99 say?").unwrap();
    assert!(matches!(
        outcome,
        Outcome::NoMatches {
            language: Language::English,
            ..
        }
    ));
    let calls = calls.lock().unwrap();
    assert_eq!(calls.searches, 1);
    assert!(calls.completions.is_empty());
}

#[test]
fn metadata_only_retrieval_is_an_empty_result() {
    let (assistant, calls) = Harness::new(vec![metadata_record()]).build();
    let outcome = assistant.ask("ما هو قانون البينات؟").unwrap();
    assert!(matches!(outcome, Outcome::NoMatches { .. }));
    assert!(calls.lock().unwrap().completions.is_empty());
}

#[test]
fn result_count_never_exceeds_limit() {
    let rows: Vec<Article> = (1..=20)
        .map(|n| article(&n.to_string(), "Title", "Body"))
        .collect();
    let (assistant, _calls) = Harness::new(rows).reply(Ok("answer")).build();
    let Outcome::Answered(answer) = assistant.ask_with_limit("question", 5).unwrap() else {
        panic!("expected an answer");
    };
    assert_eq!(answer.articles.len(), 5);
    let numbers: Vec<_> = answer.articles.iter().map(Article::number).collect();
    assert_eq!(numbers, ["1", "2", "3", "4", "5"]);
}

#[test]
fn retrieval_is_deterministic() {
    let (assistant, _calls) = Harness::new(amendment_pair()).build();
    let first = assistant.prepare("المادة 8", 10).unwrap();
    let second = assistant.prepare("المادة 8", 10).unwrap();
    assert_eq!(first.articles, second.articles);
    assert_eq!(first.prompt, second.prompt);
}

#[test]
fn wrong_dimension_vector_is_a_retrieval_failure() {
    let mut harness = Harness::new(amendment_pair()).reply(Ok("unused"));
    harness.encoder_dims = DIMS * 2;
    let (assistant, calls) = harness.build();
    let err = assistant.ask("What changed in article 8?").unwrap_err();
    assert!(matches!(err, PipelineError::Retrieval(_)), "got {err:?}");
    let calls = calls.lock().unwrap();
    assert_eq!(calls.searches, 0);
    assert!(calls.completions.is_empty());
}

#[test]
fn encoder_failures_abort_the_request() {
    let mut harness = Harness::new(amendment_pair());
    harness.encoder_fail = Some(|| ServiceError::Malformed("input too long".into()));
    let (assistant, calls) = harness.build();
    let err = assistant.ask("question").unwrap_err();
    assert!(matches!(err, PipelineError::Encoding(_)));
    assert_eq!(calls.lock().unwrap().searches, 0);

    let mut harness = Harness::new(amendment_pair());
    harness.encoder_fail = Some(|| ServiceError::Timeout);
    let (assistant, _calls) = harness.build();
    assert!(matches!(
        assistant.ask("question").unwrap_err(),
        PipelineError::Timeout {
            stage: Stage::Embedding
        }
    ));
}

#[test]
fn generation_failures_are_not_retried() {
    let (assistant, calls) = Harness::new(amendment_pair())
        .reply(Err(ServiceError::Malformed("rate limited".into())))
        .reply(Ok("would be a retry"))
        .build();
    let err = assistant.ask("question").unwrap_err();
    assert!(matches!(err, PipelineError::Generation(_)));
    assert!(err.is_service_failure());
    assert_eq!(calls.lock().unwrap().completions.len(), 1);
}

#[test]
fn blank_completion_is_a_generation_failure() {
    let (assistant, _calls) = Harness::new(amendment_pair()).reply(Ok(" \n ")).build();
    assert!(matches!(
        assistant.ask("question").unwrap_err(),
        PipelineError::Generation(_)
    ));
}

#[test]
fn empty_question_makes_no_calls() {
    let (assistant, calls) = Harness::new(amendment_pair()).build();
    assert!(matches!(
        assistant.ask("   ").unwrap_err(),
        PipelineError::InvalidQuestion(_)
    ));
    let calls = calls.lock().unwrap();
    assert!(calls.embedded.is_empty());
    assert_eq!(calls.searches, 0);
}

#[test]
fn rewrite_is_used_for_retrieval_only() {
    let mut harness = Harness::new(amendment_pair())
        .reply(Ok("\"أحكام تعديل المادة الثامنة من قانون البينات\""))
        .reply(Ok("الجواب"));
    harness.config.rewrite_queries = true;
    let (assistant, calls) = harness.build();

    let question = "شو صار بالمادة 8؟";
    let Outcome::Answered(answer) = assistant.ask(question).unwrap() else {
        panic!("expected an answer");
    };
    assert_eq!(
        answer.rewritten_query.as_deref(),
        Some("أحكام تعديل المادة الثامنة من قانون البينات")
    );

    let calls = calls.lock().unwrap();
    assert_eq!(
        calls.embedded,
        ["أحكام تعديل المادة الثامنة من قانون البينات"]
    );
    assert_eq!(calls.completions.len(), 2);
    assert_eq!(calls.completions[0].1, question);
    let (system, _) = &calls.completions[1];
    assert!(system.contains(&format!("Question: {question}")));
    assert!(!system.contains("Question: أحكام"));
}

#[test]
fn rewrite_failure_falls_back_to_the_original_question() {
    let mut harness = Harness::new(amendment_pair())
        .reply(Err(ServiceError::Timeout))
        .reply(Ok("answer"));
    harness.config.rewrite_queries = true;
    let (assistant, calls) = harness.build();

    let Outcome::Answered(answer) = assistant.ask("What changed in article 8?").unwrap() else {
        panic!("expected an answer");
    };
    assert_eq!(answer.rewritten_query, None);
    assert_eq!(
        calls.lock().unwrap().embedded,
        ["What changed in article 8?"]
    );
}

#[test]
fn prompt_language_follows_the_question() {
    let (assistant, _calls) = Harness::new(amendment_pair()).build();

    let arabic = assistant
        .prepare("هل الشهادة وحدها تكفي لإثبات حق مالي كبير؟", 5)
        .unwrap()
        .prompt
        .unwrap();
    assert!(arabic.system.contains("Answer in Arabic"));
    assert!(contains_arabic(&arabic.system));

    let english = assistant
        .prepare("Is testimony alone enough to prove a large debt?", 5)
        .unwrap()
        .prompt
        .unwrap();
    assert!(english.system.contains("Answer in English"));
    assert!(english.system.contains("Article 8: "));
}

#[test]
fn prepare_without_matches_has_no_prompt() {
    let (assistant, calls) = Harness::new(vec![metadata_record()]).build();
    let prepared = assistant.prepare("question", 5).unwrap();
    assert!(prepared.articles.is_empty());
    assert!(prepared.prompt.is_none());
    assert!(calls.lock().unwrap().completions.is_empty());
}

#[test]
fn outcome_serializes_with_status_tag() {
    let (assistant, _calls) = Harness::new(Vec::new()).build();
    let outcome = assistant.ask("question").unwrap();
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "no_matches");
    assert_eq!(json["language"], "english");
}

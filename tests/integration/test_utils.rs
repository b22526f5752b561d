//! Shared test utilities: a scriptable mock gateway and a fully wired engine
//! over a temporary sled database.

use async_trait::async_trait;
use courseforge::audit::AuditRecorder;
use courseforge::course::{
    Assessment, AssistanceTier, BloomLevel, Course, LearningObjective, Lesson, Subtopic, Topic,
};
use courseforge::error::EngineError;
use courseforge::gateway::{
    GenerationGateway, GenerationMetadata, GenerationReply, GenerationRequest,
};
use courseforge::invocation::{InvocationEngine, InvocationNumber, InvocationPayload};
use courseforge::manager::CourseManager;
use courseforge::store::SledCourseStore;
use courseforge::types::Actor;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

/// A believable generated payload for each invocation stage.
pub fn sample_payload(invocation: InvocationNumber) -> InvocationPayload {
    match invocation {
        InvocationNumber::Description => InvocationPayload::Description {
            description: "This course walks practitioners through the design, operation, and \
                          troubleshooting of distributed systems, grounded in worked examples."
                .to_string(),
            assistance_tier: Some(AssistanceTier::Full),
        },
        InvocationNumber::Objectives => InvocationPayload::Objectives {
            learning_objectives: vec![
                LearningObjective {
                    code: "LO1".into(),
                    text: "Describe the components of a distributed system".into(),
                    bloom_level: Some(BloomLevel::Understand),
                },
                LearningObjective {
                    code: "LO2".into(),
                    text: "Analyze failure modes in replicated services".into(),
                    bloom_level: Some(BloomLevel::Analyze),
                },
                LearningObjective {
                    code: "LO3".into(),
                    text: "Design a partition-tolerant storage layout".into(),
                    bloom_level: Some(BloomLevel::Create),
                },
            ],
        },
        InvocationNumber::Structure => InvocationPayload::Structure {
            topics: sample_topics(),
        },
        InvocationNumber::FullBuild => InvocationPayload::FullBuild {
            topics: sample_topics(),
            assessments: vec![
                Assessment {
                    question: "Which property does a quorum read guarantee?".into(),
                    options: vec!["Linearizability".into(), "Monotonic reads".into()],
                    correct_answer: Some("Monotonic reads".into()),
                    linked_objective: Some("LO2".into()),
                },
                Assessment {
                    question: "Name two partition-handling strategies.".into(),
                    options: vec![],
                    correct_answer: Some("Hinted handoff, read repair".into()),
                    linked_objective: Some("LO3".into()),
                },
            ],
        },
        InvocationNumber::TemplateMapping => InvocationPayload::TemplateMapping {
            mappings: vec![courseforge::course::TemplateMapping {
                section: "Overview".into(),
                template_slot: "slide-1".into(),
                evidence_grade: Some(courseforge::course::EvidenceGrade::A),
            }],
        },
    }
}

fn sample_topics() -> Vec<Topic> {
    vec![
        Topic {
            title: "Foundations".into(),
            subtopics: vec![Subtopic {
                title: "Consistency Models".into(),
                lessons: (1..=3)
                    .map(|i| Lesson {
                        title: format!("Lesson {i}"),
                        duration_minutes: Some(45),
                    })
                    .collect(),
            }],
        },
        Topic {
            title: "Operations".into(),
            subtopics: vec![Subtopic {
                title: "Failure Handling".into(),
                lessons: (1..=3)
                    .map(|i| Lesson {
                        title: format!("Drill {i}"),
                        duration_minutes: Some(30),
                    })
                    .collect(),
            }],
        },
    ]
}

/// Scriptable gateway: per-invocation payload overrides, optional scripted
/// failures, and a log of every request received.
#[derive(Default)]
pub struct MockGateway {
    overrides: Mutex<HashMap<u8, InvocationPayload>>,
    failures: Mutex<HashMap<u8, String>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_payload(&self, invocation: InvocationNumber, payload: InvocationPayload) {
        self.overrides.lock().insert(invocation.as_u8(), payload);
    }

    pub fn script_failure(&self, invocation: InvocationNumber, message: &str) {
        self.failures
            .lock()
            .insert(invocation.as_u8(), message.to_string());
    }

    pub fn clear_failure(&self, invocation: InvocationNumber) {
        self.failures.lock().remove(&invocation.as_u8());
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl GenerationGateway for MockGateway {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationReply, EngineError> {
        let invocation = request.invocation;
        self.requests.lock().push(request);

        if let Some(message) = self.failures.lock().get(&invocation.as_u8()) {
            return Err(EngineError::Generation(message.clone()));
        }
        let payload = self
            .overrides
            .lock()
            .get(&invocation.as_u8())
            .cloned()
            .unwrap_or_else(|| sample_payload(invocation));
        Ok(GenerationReply {
            payload,
            metadata: GenerationMetadata {
                model: "mock-model".into(),
                tokens_used: 256,
                duration_ms: 5,
            },
        })
    }
}

/// Fully wired engine over a temporary sled database.
pub struct Harness {
    pub manager: CourseManager,
    pub engine: InvocationEngine,
    pub recorder: AuditRecorder,
    pub gateway: Arc<MockGateway>,
    pub db: sled::Db,
    _dir: TempDir,
}

pub fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let db = sled::open(dir.path()).unwrap();
    let store = Arc::new(SledCourseStore::new(&db).unwrap());
    let recorder = AuditRecorder::sled(&db).unwrap();
    let gateway = Arc::new(MockGateway::new());
    let engine = InvocationEngine::new(store.clone(), gateway.clone(), recorder.clone());
    let manager = CourseManager::new(store, recorder.clone());
    Harness {
        manager,
        engine,
        recorder,
        gateway,
        db,
        _dir: dir,
    }
}

/// Wire an engine around an arbitrary gateway (for blocking/failing doubles).
pub fn harness_with_gateway(gateway: Arc<dyn GenerationGateway>) -> Harness {
    let dir = TempDir::new().unwrap();
    let db = sled::open(dir.path()).unwrap();
    let store = Arc::new(SledCourseStore::new(&db).unwrap());
    let recorder = AuditRecorder::sled(&db).unwrap();
    let mock = Arc::new(MockGateway::new());
    let engine = InvocationEngine::new(store.clone(), gateway, recorder.clone());
    let manager = CourseManager::new(store, recorder.clone());
    Harness {
        manager,
        engine,
        recorder,
        gateway: mock,
        db,
        _dir: dir,
    }
}

pub fn owner() -> Actor {
    Actor::user("author-1")
}

pub fn admin() -> Actor {
    Actor::admin("admin-1")
}

/// Create a course and commit its title so Gate B is open.
pub fn titled_course(harness: &Harness, actor: &Actor, title: &str) -> Course {
    let course = harness.manager.create(actor, None, Default::default()).unwrap();
    harness
        .manager
        .save_title(actor, &course.id, title)
        .unwrap()
}

/// Execute and accept invocations 1..=n in order.
pub async fn complete_through(
    harness: &Harness,
    actor: &Actor,
    course: &Course,
    last: InvocationNumber,
) -> Course {
    let mut current = course.clone();
    for invocation in InvocationNumber::ALL {
        if invocation.as_u8() > last.as_u8() {
            break;
        }
        harness
            .engine
            .execute(actor, &current.id, invocation)
            .await
            .unwrap();
        current = harness
            .engine
            .accept(actor, &current.id, invocation, None)
            .unwrap();
    }
    current
}

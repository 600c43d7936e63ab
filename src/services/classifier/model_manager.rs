use super::ModelHandle;
use crate::error::AppError;
use crate::models::classify_types::ModelStatus;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tokio::sync::Mutex;

/// Produces the classifier. Called at most once per `ModelLoader`.
pub trait ModelSource: Send + Sync {
    fn load(&self) -> BoxFuture<'_, Result<ModelHandle, AppError>>;
}

/// Loads the classifier once and publishes the handle.
///
/// A failed load is final for the lifetime of the loader: later calls to
/// [`ModelLoader::initialize`] return the same error without trying again.
pub struct ModelLoader {
    source: Box<dyn ModelSource>,
    handle: OnceLock<ModelHandle>,
    failure: OnceLock<String>,
    /// Serializes load attempts.
    attempt: Mutex<()>,
    loading: AtomicBool,
}

/// Clears the loading flag even if the source panics.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ModelLoader {
    pub fn new(source: Box<dyn ModelSource>) -> Self {
        Self {
            source,
            handle: OnceLock::new(),
            failure: OnceLock::new(),
            attempt: Mutex::new(()),
            loading: AtomicBool::new(false),
        }
    }

    pub async fn initialize(&self) -> Result<ModelHandle, AppError> {
        if let Some(done) = self.finished() {
            return done;
        }

        // Held across the load so concurrent callers wait for the one attempt.
        let _attempt = self.attempt.lock().await;
        if let Some(done) = self.finished() {
            return done;
        }

        log::info!("Loading classifier");
        self.loading.store(true, Ordering::SeqCst);
        let result = {
            let _loading = LoadingGuard(&self.loading);
            self.source.load().await
        };

        match result {
            Ok(handle) => {
                let handle = self.handle.get_or_init(|| handle).clone();
                log::info!("Classifier ready");
                Ok(handle)
            }
            Err(e) => {
                let message = match e {
                    AppError::ModelLoad(message) => message,
                    other => other.to_string(),
                };
                log::error!("Failed to load classifier: {}", message);
                let message = self.failure.get_or_init(|| message).clone();
                Err(AppError::ModelLoad(message))
            }
        }
    }

    fn finished(&self) -> Option<Result<ModelHandle, AppError>> {
        if let Some(handle) = self.handle.get() {
            return Some(Ok(handle.clone()));
        }
        self.failure
            .get()
            .map(|message| Err(AppError::ModelLoad(message.clone())))
    }

    pub fn is_ready(&self) -> bool {
        self.handle.get().is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// The published handle, or `ModelNotReady` while loading or after a failed load.
    pub fn handle(&self) -> Result<ModelHandle, AppError> {
        self.handle.get().cloned().ok_or(AppError::ModelNotReady)
    }

    pub fn error(&self) -> Option<String> {
        self.failure.get().cloned()
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus {
            loading: self.is_loading(),
            ready: self.is_ready(),
            error: self.error(),
        }
    }
}

/// Upper bound on `id2label` indices. ImageNet heads have 1000 or 1001.
const MAX_CLASSES: usize = 100_000;

/// Parses a Hugging Face style `config.json` `id2label` map into an index-ordered list.
pub fn parse_id2label(config: &serde_json::Value) -> Result<Vec<String>, AppError> {
    let id2label = config["id2label"]
        .as_object()
        .ok_or_else(|| AppError::ModelLoad("Config missing id2label field".to_string()))?;

    let mut labels: Vec<(usize, String)> = id2label
        .iter()
        .map(|(k, v)| {
            let idx = k
                .parse::<usize>()
                .map_err(|_| AppError::ModelLoad(format!("Invalid label index {:?}", k)))?;
            let label = v.as_str().unwrap_or("unknown").to_string();
            Ok((idx, label))
        })
        .collect::<Result<_, AppError>>()?;
    labels.sort_by_key(|(idx, _)| *idx);

    // Fill gaps so position == class index.
    let len = match labels.last() {
        Some((idx, _)) if *idx < MAX_CLASSES => idx + 1,
        Some((idx, _)) => {
            return Err(AppError::ModelLoad(format!(
                "Label index {} exceeds the {} class limit",
                idx, MAX_CLASSES
            )))
        }
        None => 0,
    };
    let mut ordered = vec![String::new(); len];
    for (idx, label) in labels {
        ordered[idx] = label;
    }
    for (idx, slot) in ordered.iter_mut().enumerate() {
        if slot.is_empty() {
            *slot = format!("class_{}", idx);
        }
    }
    Ok(ordered)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::classify_types::Prediction;
    use crate::services::classifier::{Classifier, Tensor3D};
    use futures::FutureExt;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    pub(crate) struct FixedClassifier(pub Vec<Prediction>);

    impl Classifier for FixedClassifier {
        fn classify(&self, _image: &Tensor3D, top_k: usize) -> Result<Vec<Prediction>, AppError> {
            Ok(self.0.iter().take(top_k).cloned().collect())
        }
    }

    pub(crate) struct StaticSource {
        pub handle: Option<ModelHandle>,
        pub calls: Arc<AtomicUsize>,
    }

    impl ModelSource for StaticSource {
        fn load(&self) -> BoxFuture<'_, Result<ModelHandle, AppError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .handle
                .clone()
                .ok_or_else(|| AppError::ModelLoad("asset unreachable".to_string()));
            async move {
                tokio::task::yield_now().await;
                result
            }
            .boxed()
        }
    }

    fn loader(handle: Option<ModelHandle>) -> (ModelLoader, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = StaticSource {
            handle,
            calls: calls.clone(),
        };
        (ModelLoader::new(Box::new(source)), calls)
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let (loader, calls) = loader(Some(Arc::new(FixedClassifier(vec![]))));
        assert!(!loader.is_ready());
        assert!(matches!(loader.handle(), Err(AppError::ModelNotReady)));

        loader.initialize().await.unwrap();
        loader.initialize().await.unwrap();

        assert!(loader.is_ready());
        assert!(loader.handle().is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            loader.status(),
            ModelStatus {
                loading: false,
                ready: true,
                error: None
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_initialize_loads_once() {
        let (loader, calls) = loader(Some(Arc::new(FixedClassifier(vec![]))));
        let loader = Arc::new(loader);

        let a = tokio::spawn({
            let loader = loader.clone();
            async move { loader.initialize().await.map(|_| ()) }
        });
        let b = tokio::spawn({
            let loader = loader.clone();
            async move { loader.initialize().await.map(|_| ()) }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_is_not_retried() {
        let (loader, calls) = loader(None);

        let first = loader.initialize().await.err().unwrap();
        let second = loader.initialize().await.err().unwrap();

        assert_eq!(first.kind(), "modelLoad");
        assert_eq!(second.to_string(), first.to_string());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!loader.is_ready());
        assert_eq!(loader.error().as_deref(), Some("asset unreachable"));
        assert!(matches!(loader.handle(), Err(AppError::ModelNotReady)));
    }

    #[tokio::test]
    async fn error_stays_visible_while_a_caller_waits() {
        let (loader, _) = loader(None);
        assert!(loader.initialize().await.is_err());

        let _held = loader.attempt.lock().await;
        let status = loader.status();
        assert!(!status.loading);
        assert_eq!(status.error.as_deref(), Some("asset unreachable"));
    }

    struct PanickingSource;

    impl ModelSource for PanickingSource {
        fn load(&self) -> BoxFuture<'_, Result<ModelHandle, AppError>> {
            futures::future::lazy(|_| -> Result<ModelHandle, AppError> { panic!("source blew up") }).boxed()
        }
    }

    #[tokio::test]
    async fn panicking_source_does_not_stay_loading() {
        let loader = Arc::new(ModelLoader::new(Box::new(PanickingSource)));
        let task = tokio::spawn({
            let loader = loader.clone();
            async move { loader.initialize().await.map(|_| ()) }
        });
        assert!(task.await.is_err());
        assert!(!loader.is_loading());
        assert!(!loader.is_ready());
    }

    #[test]
    fn id2label_is_index_ordered() {
        let config = serde_json::json!({
            "id2label": { "2": "fox", "0": "background", "1": "tabby cat" }
        });
        let labels = parse_id2label(&config).unwrap();
        assert_eq!(labels, vec!["background", "tabby cat", "fox"]);
    }

    #[test]
    fn id2label_gaps_get_placeholder_names() {
        let config = serde_json::json!({ "id2label": { "0": "a", "2": "c" } });
        assert_eq!(parse_id2label(&config).unwrap(), vec!["a", "class_1", "c"]);
    }

    #[test]
    fn id2label_huge_index_is_load_error() {
        for key in ["18446744073709551615", "1000000000000"] {
            let config: serde_json::Value =
                serde_json::from_str(&format!(r#"{{"id2label":{{"0":"a","{}":"z"}}}}"#, key)).unwrap();
            assert_eq!(parse_id2label(&config).unwrap_err().kind(), "modelLoad");
        }
    }

    #[tokio::test]
    async fn malformed_labels_make_the_model_unavailable() {
        struct BadLabels;

        impl ModelSource for BadLabels {
            fn load(&self) -> BoxFuture<'_, Result<ModelHandle, AppError>> {
                async {
                    let config = serde_json::json!({ "id2label": { "0": "a", "18446744073709551615": "z" } });
                    parse_id2label(&config)?;
                    Ok::<ModelHandle, AppError>(Arc::new(FixedClassifier(vec![])))
                }
                .boxed()
            }
        }

        let loader = ModelLoader::new(Box::new(BadLabels));
        assert_eq!(loader.initialize().await.err().unwrap().kind(), "modelLoad");
        let status = loader.status();
        assert!(!status.loading && !status.ready);
        assert!(status.error.is_some());
    }

    #[test]
    fn id2label_missing_is_load_error() {
        let err = parse_id2label(&serde_json::json!({})).unwrap_err();
        assert_eq!(err.kind(), "modelLoad");
    }
}

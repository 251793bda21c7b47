use std::convert::Infallible;
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, Criterion};
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri};
use http_body_util::Full;
use storefront_cache::prelude::*;
use tokio::runtime::Runtime;
use tokio::time::sleep;
use tower::{Layer, Service, ServiceExt};

fn tokio_runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| Runtime::new().expect("failed to build Tokio runtime"))
}

fn request(path_and_query: &str) -> Request<()> {
    Request::builder()
        .method(Method::GET)
        .uri(path_and_query)
        .body(())
        .expect("valid request")
}

fn bench_layer_throughput(c: &mut Criterion) {
    let rt = tokio_runtime();

    let inner_service = tower::service_fn(|_req: Request<()>| async move {
        sleep(Duration::from_micros(200)).await;
        Ok::<_, Infallible>(
            Response::builder()
                .status(StatusCode::OK)
                .header("content-type", "application/json")
                .body(Full::from(Bytes::from_static(b"{\"ok\":true}")))
                .unwrap(),
        )
    });

    let hit_layer = CacheLayer::builder(InMemoryStore::new())
        .ttl(Duration::from_secs(60))
        .tags(["products"])
        .build();
    let miss_layer = CacheLayer::builder(InMemoryStore::new())
        .ttl(Duration::from_secs(60))
        .build();

    let hit_request = request("/products/42?locale=en-US");
    rt.block_on({
        let mut warm_service = hit_layer.layer(inner_service.clone());
        let req = hit_request.clone();
        async move {
            warm_service.ready().await.unwrap();
            let _ = warm_service.call(req).await.unwrap();
        }
    });

    let mut baseline_service = inner_service.clone();
    let mut cached_hit_service = hit_layer.layer(inner_service.clone());
    let mut cached_miss_service = miss_layer.layer(inner_service.clone());

    let miss_requests: Vec<Request<()>> = (0..512)
        .map(|i| request(&format!("/products/{i}?locale=en-US")))
        .collect();
    let miss_cursor = Arc::new(AtomicUsize::new(0));

    c.bench_function("layer_throughput/baseline_inner", |b| {
        b.iter(|| {
            rt.block_on(async {
                baseline_service.ready().await.unwrap();
                let resp = baseline_service.call(hit_request.clone()).await.unwrap();
                black_box(resp.status());
            });
        });
    });

    c.bench_function("layer_throughput/cache_hit", |b| {
        b.iter(|| {
            rt.block_on(async {
                cached_hit_service.ready().await.unwrap();
                let resp = cached_hit_service.call(hit_request.clone()).await.unwrap();
                black_box(resp.status());
            });
        });
    });

    c.bench_function("layer_throughput/cache_miss", |b| {
        b.iter(|| {
            let idx = miss_cursor.fetch_add(1, Ordering::Relaxed);
            let req = miss_requests[idx % miss_requests.len()].clone();
            rt.block_on(async {
                cached_miss_service.ready().await.unwrap();
                let resp = cached_miss_service.call(req).await.unwrap();
                black_box(resp.status());
            });
        });
    });
}

fn bench_key_generator(c: &mut Criterion) {
    let hashed = KeyGenerator::default();
    let custom = KeyGenerator::custom(|_method, uri, headers| {
        let user = headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("anonymous");
        format!("{user}:{}", uri.path())
    });

    let method = Method::GET;
    let uri = Uri::from_static("/products?category=cat1&sort=price&page=2");
    let bare_uri = Uri::from_static("/products");
    let headers = HeaderMap::new();

    c.bench_function("key_generator/hashed_with_query", |b| {
        b.iter(|| {
            let key = hashed.generate(&method, &uri, &headers);
            black_box(key);
        });
    });

    c.bench_function("key_generator/hashed_bare_path", |b| {
        b.iter(|| {
            let key = hashed.generate(&method, &bare_uri, &headers);
            black_box(key);
        });
    });

    c.bench_function("key_generator/custom", |b| {
        b.iter(|| {
            let key = custom.generate(&method, &uri, &headers);
            black_box(key);
        });
    });
}

fn bench_in_memory_store(c: &mut Criterion) {
    let rt = tokio_runtime();
    let store = InMemoryStore::new();
    let ttl = Duration::from_secs(60);
    let payload_small = vec![b'x'; 256];
    let payload_large = vec![b'x'; 64 * 1024];

    rt.block_on(async {
        store
            .set_ex("cache:bench:small", payload_small.clone(), ttl)
            .await
            .unwrap();
        store
            .set_ex("cache:bench:large", payload_large.clone(), ttl)
            .await
            .unwrap();
        for i in 0..1_000 {
            store
                .set_ex(&format!("cache:bench:fill:{i}"), payload_small.clone(), ttl)
                .await
                .unwrap();
        }
    });

    c.bench_function("store/in_memory/get_small_hit", |b| {
        b.iter(|| {
            rt.block_on(async {
                let hit = store.get("cache:bench:small").await.unwrap();
                black_box(hit);
            });
        });
    });

    c.bench_function("store/in_memory/get_large_hit", |b| {
        b.iter(|| {
            rt.block_on(async {
                let hit = store.get("cache:bench:large").await.unwrap();
                black_box(hit);
            });
        });
    });

    c.bench_function("store/in_memory/set_small", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .set_ex("cache:bench:rewrite", payload_small.clone(), ttl)
                    .await
                    .unwrap();
            });
        });
    });

    c.bench_function("store/in_memory/keys_glob_scan", |b| {
        b.iter(|| {
            rt.block_on(async {
                let keys = store.keys("cache:bench:fill:*").await.unwrap();
                black_box(keys.len());
            });
        });
    });
}

criterion_group!(
    benches,
    bench_layer_throughput,
    bench_key_generator,
    bench_in_memory_store
);
criterion_main!(benches);

//! Video create/update with file parts, and rollback of the whole unit of
//! work when relation sync or a file write fails.

mod common;

use std::path::Path;
use std::sync::Arc;

use assert_matches::assert_matches;
use axum::http::{Method, StatusCode};
use catalog_api::error::AppError;
use catalog_api::services::VideoSync;
use catalog_core::attributes::Attributes;
use catalog_core::rating::Rating;
use catalog_core::uploads::UploadedFile;
use catalog_core::validation::video::{file_rule, VideoInput};
use catalog_db::repositories::VideoRepo;
use common::{
    body_json, build_test_app, build_test_app_with_store, multipart_body, send_multipart, FilePart,
    FlakyStore,
};
use sqlx::PgPool;

const MP4_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42 fake video";
const JPG_BYTES: &[u8] = b"\xff\xd8\xff\xe0 fake banner";
const NEW_MP4_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42 another video";

fn hash_name(file_name: &str, data: &[u8]) -> String {
    UploadedFile::new(file_name, None, data.to_vec()).hash_name()
}

/// Scalar fields plus relation lists in the `name[]` form.
fn form_fields(category: &str, genre: &str) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = common::video_scalars()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    fields.push(("categories_id[]".into(), category.into()));
    fields.push(("genres_id[]".into(), genre.into()));
    fields
}

fn borrowed(fields: &[(String, String)]) -> Vec<(&str, &str)> {
    fields
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_store_with_files_writes_them_under_video_dir(pool: PgPool) {
    let (category, genre) = common::linked_pair(&pool).await;
    let test = build_test_app(pool).await;

    let fields = form_fields(&category.to_string(), &genre.to_string());
    let body = multipart_body(
        &borrowed(&fields),
        &[
            FilePart {
                field: "video_file",
                file_name: "movie.mp4",
                content_type: "video/mp4",
                data: MP4_BYTES,
            },
            FilePart {
                field: "banner_file",
                file_name: "banner.jpg",
                content_type: "image/jpeg",
                data: JPG_BYTES,
            },
        ],
    );

    let response = send_multipart(test.app(), Method::POST, "/api/v1/videos", body).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let data = &json["data"];
    let id = data["id"].as_str().unwrap();
    let video_name = hash_name("movie.mp4", MP4_BYTES);
    let banner_name = hash_name("banner.jpg", JPG_BYTES);

    assert_eq!(data["video_file"], video_name.as_str());
    assert_eq!(data["banner_file"], banner_name.as_str());
    assert!(data["thumb_file"].is_null());
    assert_eq!(
        data["video_file_url"],
        format!("{}/{id}/{video_name}", common::STORAGE_BASE_URL)
    );

    assert_eq!(std::fs::read(test.stored_path(id, &video_name)).unwrap(), MP4_BYTES);
    assert!(test.stored_path(id, &banner_name).exists());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_replaces_resubmitted_file_and_keeps_others(pool: PgPool) {
    let (category, genre) = common::linked_pair(&pool).await;
    let test = build_test_app(pool).await;
    let fields = form_fields(&category.to_string(), &genre.to_string());

    let body = multipart_body(
        &borrowed(&fields),
        &[
            FilePart {
                field: "video_file",
                file_name: "movie.mp4",
                content_type: "video/mp4",
                data: MP4_BYTES,
            },
            FilePart {
                field: "banner_file",
                file_name: "banner.jpg",
                content_type: "image/jpeg",
                data: JPG_BYTES,
            },
        ],
    );
    let created = body_json(send_multipart(test.app(), Method::POST, "/api/v1/videos", body).await).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let body = multipart_body(
        &borrowed(&fields),
        &[FilePart {
            field: "video_file",
            file_name: "other.mp4",
            content_type: "video/mp4",
            data: NEW_MP4_BYTES,
        }],
    );
    let response = send_multipart(
        test.app(),
        Method::PUT,
        &format!("/api/v1/videos/{id}"),
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let old_video = hash_name("movie.mp4", MP4_BYTES);
    let new_video = hash_name("other.mp4", NEW_MP4_BYTES);
    let banner = hash_name("banner.jpg", JPG_BYTES);

    assert_eq!(json["data"]["video_file"], new_video.as_str());
    assert_eq!(json["data"]["banner_file"], banner.as_str());
    assert!(test.stored_path(&id, &new_video).exists());
    assert!(!test.stored_path(&id, &old_video).exists());
    assert!(test.stored_path(&id, &banner).exists());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_file_type_is_checked(pool: PgPool) {
    let (category, genre) = common::linked_pair(&pool).await;
    let test = build_test_app(pool.clone()).await;
    let fields = form_fields(&category.to_string(), &genre.to_string());

    let body = multipart_body(
        &borrowed(&fields),
        &[
            FilePart {
                field: "video_file",
                file_name: "movie.avi",
                content_type: "video/x-msvideo",
                data: MP4_BYTES,
            },
            FilePart {
                field: "thumb_file",
                file_name: "thumb.txt",
                content_type: "text/plain",
                data: b"not an image",
            },
        ],
    );
    let response = send_multipart(test.app(), Method::POST, "/api/v1/videos", body).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert!(json["errors"]["video_file"][0]
        .as_str()
        .unwrap()
        .contains("video/mp4"));
    assert!(json["errors"]["thumb_file"][0]
        .as_str()
        .unwrap()
        .contains("image"));
    assert_eq!(VideoRepo::count(&pool).await.unwrap(), 0);
    assert_eq!(count_files(test.storage.path()), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_relation_sync_failure_rolls_back_insert(pool: PgPool) {
    let (category, _) = common::linked_pair(&pool).await;
    let test = build_test_app(pool.clone()).await;

    // Skips validation, so the unknown genre only surfaces as an FK error
    // while the join rows are written.
    let input = VideoInput {
        title: "title".into(),
        description: "description".into(),
        year_launched: 2010,
        rating: Rating::from_code("L").unwrap(),
        duration: 90,
        opened: None,
        categories_id: vec![category],
        genres_id: vec![uuid::Uuid::new_v4()],
    };

    let result = VideoSync::new(&pool, &test.uploads)
        .store_validated(input, Attributes::new())
        .await;

    assert_matches!(result, Err(AppError::Database(_)));
    assert_eq!(VideoRepo::count(&pool).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_upload_failure_rolls_back_and_removes_written_files(pool: PgPool) {
    let (category, genre) = common::linked_pair(&pool).await;
    let storage = tempfile::tempdir().unwrap();
    let store = FlakyStore::new(storage.path(), 1).await;
    let test = build_test_app_with_store(pool.clone(), storage, Arc::new(store));

    let fields = form_fields(&category.to_string(), &genre.to_string());
    let body = multipart_body(
        &borrowed(&fields),
        &[
            FilePart {
                field: "video_file",
                file_name: "movie.mp4",
                content_type: "video/mp4",
                data: MP4_BYTES,
            },
            FilePart {
                field: "banner_file",
                file_name: "banner.jpg",
                content_type: "image/jpeg",
                data: JPG_BYTES,
            },
        ],
    );

    let response = send_multipart(test.app(), Method::POST, "/api/v1/videos", body).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(VideoRepo::count(&pool).await.unwrap(), 0);
    assert_eq!(count_files(test.storage.path()), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_update_keeps_existing_files(pool: PgPool) {
    let (category, genre) = common::linked_pair(&pool).await;
    let storage = tempfile::tempdir().unwrap();
    // One write for the create, the update's second file fails.
    let store = FlakyStore::new(storage.path(), 2).await;
    let test = build_test_app_with_store(pool.clone(), storage, Arc::new(store));
    let fields = form_fields(&category.to_string(), &genre.to_string());

    let body = multipart_body(
        &borrowed(&fields),
        &[FilePart {
            field: "video_file",
            file_name: "movie.mp4",
            content_type: "video/mp4",
            data: MP4_BYTES,
        }],
    );
    let created = body_json(send_multipart(test.app(), Method::POST, "/api/v1/videos", body).await).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    // Resubmits the same video bytes (already stored) plus a new banner.
    let body = multipart_body(
        &borrowed(&fields),
        &[
            FilePart {
                field: "video_file",
                file_name: "movie.mp4",
                content_type: "video/mp4",
                data: MP4_BYTES,
            },
            FilePart {
                field: "banner_file",
                file_name: "banner.jpg",
                content_type: "image/jpeg",
                data: JPG_BYTES,
            },
        ],
    );
    let response = send_multipart(
        test.app(),
        Method::PUT,
        &format!("/api/v1/videos/{id}"),
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let video_name = hash_name("movie.mp4", MP4_BYTES);
    assert!(test.stored_path(&id, &video_name).exists());
    assert!(!test.stored_path(&id, &hash_name("banner.jpg", JPG_BYTES)).exists());

    let video = VideoRepo::find_by_id(&pool, id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(video.video_file.as_deref(), Some(video_name.as_str()));
    assert!(video.banner_file.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_oversized_part_is_refused_while_reading(pool: PgPool) {
    let (category, genre) = common::linked_pair(&pool).await;
    let test = build_test_app(pool.clone()).await;
    let fields = form_fields(&category.to_string(), &genre.to_string());

    let rule = file_rule("thumb_file").unwrap();
    let too_big = vec![0u8; rule.max_size_bytes() as usize + 1];
    let body = multipart_body(
        &borrowed(&fields),
        &[FilePart {
            field: "thumb_file",
            file_name: "thumb.jpg",
            content_type: "image/jpeg",
            data: &too_big,
        }],
    );

    let response = send_multipart(test.app(), Method::POST, "/api/v1/videos", body).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["errors"]["thumb_file"][0], rule.too_large_message());
    assert_eq!(VideoRepo::count(&pool).await.unwrap(), 0);
    assert_eq!(count_files(test.storage.path()), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_file_part_on_scalar_field_is_ignored(pool: PgPool) {
    let (category, genre) = common::linked_pair(&pool).await;
    let test = build_test_app(pool).await;
    let fields: Vec<(String, String)> = form_fields(&category.to_string(), &genre.to_string())
        .into_iter()
        .filter(|(name, _)| name != "title")
        .collect();

    let body = multipart_body(
        &borrowed(&fields),
        &[FilePart {
            field: "title",
            file_name: "title.txt",
            content_type: "text/plain",
            data: b"title",
        }],
    );

    let response = send_multipart(test.app(), Method::POST, "/api/v1/videos", body).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert!(json["errors"]["title"][0]
        .as_str()
        .unwrap()
        .contains("required"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_update_keeps_file_shared_with_another_field(pool: PgPool) {
    let (category, genre) = common::linked_pair(&pool).await;
    let storage = tempfile::tempdir().unwrap();
    // Create writes one file, the update writes the trailer then fails on
    // the banner.
    let store = FlakyStore::new(storage.path(), 2).await;
    let test = build_test_app_with_store(pool.clone(), storage, Arc::new(store));
    let fields = form_fields(&category.to_string(), &genre.to_string());

    let body = multipart_body(
        &borrowed(&fields),
        &[FilePart {
            field: "video_file",
            file_name: "movie.mp4",
            content_type: "video/mp4",
            data: MP4_BYTES,
        }],
    );
    let created = body_json(send_multipart(test.app(), Method::POST, "/api/v1/videos", body).await).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    // Same bytes and extension as the stored video file, so the trailer
    // hashes to the same storage name.
    let body = multipart_body(
        &borrowed(&fields),
        &[
            FilePart {
                field: "trailer_file",
                file_name: "trailer.mp4",
                content_type: "video/mp4",
                data: MP4_BYTES,
            },
            FilePart {
                field: "banner_file",
                file_name: "banner.jpg",
                content_type: "image/jpeg",
                data: JPG_BYTES,
            },
        ],
    );
    let response = send_multipart(
        test.app(),
        Method::PUT,
        &format!("/api/v1/videos/{id}"),
        body,
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let shared = hash_name("movie.mp4", MP4_BYTES);
    assert_eq!(shared, hash_name("trailer.mp4", MP4_BYTES));
    assert!(test.stored_path(&id, &shared).exists());

    let video = VideoRepo::find_by_id(&pool, id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(video.video_file.as_deref(), Some(shared.as_str()));
    assert!(video.trailer_file.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_commit_failure_removes_uploaded_files(pool: PgPool) {
    let (category, genre) = common::linked_pair(&pool).await;

    // A deferred constraint trigger only fires at COMMIT, after the files
    // are already written.
    sqlx::query(
        "CREATE FUNCTION refuse_video_commit() RETURNS trigger AS $$
         BEGIN
             RAISE EXCEPTION 'video commit refused';
         END
         $$ LANGUAGE plpgsql",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE CONSTRAINT TRIGGER trg_refuse_video_commit
         AFTER INSERT ON videos
         DEFERRABLE INITIALLY DEFERRED
         FOR EACH ROW EXECUTE FUNCTION refuse_video_commit()",
    )
    .execute(&pool)
    .await
    .unwrap();

    let test = build_test_app(pool.clone()).await;
    let fields = form_fields(&category.to_string(), &genre.to_string());
    let body = multipart_body(
        &borrowed(&fields),
        &[
            FilePart {
                field: "video_file",
                file_name: "movie.mp4",
                content_type: "video/mp4",
                data: MP4_BYTES,
            },
            FilePart {
                field: "banner_file",
                file_name: "banner.jpg",
                content_type: "image/jpeg",
                data: JPG_BYTES,
            },
        ],
    );

    let response = send_multipart(test.app(), Method::POST, "/api/v1/videos", body).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(VideoRepo::count(&pool).await.unwrap(), 0);
    assert_eq!(count_files(test.storage.path()), 0);
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use davsync::{Action, ConnectionSettings, Depth, PropertyOption, WebDavClient, WebDavError};
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{basic_auth, bearer_token, body_string, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn create_client(server: &MockServer) -> WebDavClient {
    WebDavClient::new(ConnectionSettings::new(server.uri(), "user", "pass")).unwrap()
}

/// Multistatus body with one `<response>` per `(href, is_collection)`
fn multistatus(entries: &[(&str, bool)]) -> String {
    let responses: String = entries
        .iter()
        .map(|(href, is_collection)| {
            let resource_type = if *is_collection {
                "<d:resourcetype><d:collection/></d:resourcetype>"
            } else {
                "<d:resourcetype/><d:getcontentlength>41</d:getcontentlength>"
            };
            format!(
                "<d:response><d:href>{}</d:href><d:propstat><d:prop>{}\
                 <d:getlastmodified>Wed, 18 Oct 2017 15:16:04 GMT</d:getlastmodified>\
                 </d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>",
                href, resource_type
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><d:multistatus xmlns:d="DAV:">{}</d:multistatus>"#,
        responses
    )
}

async fn mount_existing(server: &MockServer) {
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_check_existing_resource() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/test_dir/test.txt"))
        .and(basic_auth("user", "pass"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&server);
    assert!(client.check("test_dir/test.txt").await.unwrap());
}

#[tokio::test]
async fn test_check_returns_false_on_error_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/missing.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/not_allowed.txt"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/broken.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = create_client(&server);
    assert!(!client.check("missing.txt").await.unwrap());
    assert!(!client.check("not_allowed.txt").await.unwrap());
    assert!(!client.check("broken.txt").await.unwrap());
}

#[tokio::test]
async fn test_check_requires_ok_status() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/empty.txt"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = create_client(&server);
    assert!(!client.check("empty.txt").await.unwrap());
}

#[tokio::test]
async fn test_check_disabled_skips_request() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    let settings = ConnectionSettings::new(server.uri(), "user", "pass").with_disable_check(true);
    let client = WebDavClient::new(settings).unwrap();
    assert!(client.check("anything.txt").await.unwrap());
}

#[tokio::test]
async fn test_check_with_overridden_method() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/test.txt"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let settings = ConnectionSettings::new(server.uri(), "user", "pass")
        .with_override_method(Action::Check, "GET");
    let client = WebDavClient::new(settings).unwrap();
    assert!(client.check("test.txt").await.unwrap());
}

#[tokio::test]
async fn test_token_authentication() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/test.txt"))
        .and(bearer_token("secret-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let settings = ConnectionSettings::with_token(server.uri(), "secret-token");
    let client = WebDavClient::new(settings).unwrap();
    assert!(client.check("test.txt").await.unwrap());
}

#[tokio::test]
async fn test_no_connection() {
    let settings = ConnectionSettings::new("http://127.0.0.1:1", "user", "pass");
    let client = WebDavClient::new(settings).unwrap();
    let result = client.check("test.txt").await;
    assert!(matches!(result, Err(WebDavError::NoConnection { .. })));
}

#[tokio::test]
async fn test_invalid_settings_fail_before_any_request() {
    let result = WebDavClient::new(ConnectionSettings::new("", "user", "pass"));
    assert!(matches!(result, Err(WebDavError::OptionNotValid { .. })));
}

#[tokio::test]
async fn test_list_excludes_queried_collection() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("PROPFIND"))
        .and(path("/test_dir/"))
        .and(header("depth", "1"))
        .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(&[
            ("/test_dir/", true),
            ("/test_dir/test.txt", false),
            ("/test_dir/sub%20dir/", true),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&server);
    let names = client.list("test_dir").await.unwrap();
    assert_eq!(names, vec!["test.txt", "sub dir/"]);
}

#[tokio::test]
async fn test_list_with_info() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("PROPFIND"))
        .and(path("/test_dir/"))
        .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(&[
            ("/test_dir/", true),
            ("/test_dir/test.txt", false),
        ])))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let entries = client.list_with_info("/test_dir/").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "/test_dir/test.txt");
    assert!(!entries[0].is_dir);
    assert_eq!(entries[0].info.size.as_deref(), Some("41"));
}

#[tokio::test]
async fn test_list_excludes_queried_collection_under_hostname_prefix() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("PROPFIND"))
        .and(path("/prefix/test_dir/"))
        .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(&[
            ("/prefix/test_dir/", true),
            ("/prefix/test_dir/a.txt", false),
        ])))
        .mount(&server)
        .await;

    let settings = ConnectionSettings::new(format!("{}/prefix", server.uri()), "user", "pass");
    let client = WebDavClient::new(settings).unwrap();
    assert_eq!(client.list("test_dir").await.unwrap(), vec!["a.txt"]);

    let entries = client.list_with_info("test_dir").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].is_dir);
}

#[tokio::test]
async fn test_list_missing_directory() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let result = client.list("missing").await;
    assert!(matches!(result, Err(WebDavError::RemoteResourceNotFound { .. })));
}

#[tokio::test]
async fn test_free_space_request() {
    let server = MockServer::start().await;
    Mock::given(method("PROPFIND"))
        .and(path("/"))
        .and(header("depth", "0"))
        .and(header("content-type", "text/xml"))
        .and(body_string(
            "<?xml version='1.0' encoding='UTF-8'?>\n<propfind xmlns=\"DAV:\"><prop>\
             <quota-available-bytes/><quota-used-bytes/></prop></propfind>",
        ))
        .respond_with(ResponseTemplate::new(207).set_body_string(
            r#"<?xml version="1.0" encoding="utf-8"?><d:multistatus xmlns:d="DAV:"><d:response>
               <d:href>/</d:href><d:propstat><d:prop>
               <d:quota-available-bytes>10737417543</d:quota-available-bytes>
               <d:quota-used-bytes>5065</d:quota-used-bytes>
               </d:prop></d:propstat></d:response></d:multistatus>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&server);
    assert_eq!(client.free().await.unwrap(), Some(10737417543));
}

#[tokio::test]
async fn test_mkdir_creates_collection() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("MKCOL"))
        .and(path("/new_dir/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&server);
    assert!(client.mkdir("new_dir").await.unwrap());
}

#[tokio::test]
async fn test_mkdir_treats_405_as_existing() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("MKCOL"))
        .and(path("/existing/"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;

    let client = create_client(&server);
    assert!(client.mkdir("existing/").await.unwrap());
}

#[tokio::test]
async fn test_mkdir_without_parent() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/missing/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let result = client.mkdir("missing/child").await;
    assert!(matches!(result, Err(WebDavError::RemoteParentNotFound { .. })));
}

#[tokio::test]
async fn test_upload_to_buffer() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("PUT"))
        .and(path("/test_dir/test.txt"))
        .and(body_string("test content"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&server);
    client
        .upload_to(b"test content".to_vec(), "test_dir/test.txt")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upload_to_directory_path_is_rejected() {
    let server = MockServer::start().await;
    let client = create_client(&server);
    let result = client.upload_to(b"data".to_vec(), "test_dir/").await;
    assert!(matches!(result, Err(WebDavError::OptionNotValid { .. })));
}

#[tokio::test]
async fn test_upload_file_streams_content() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("PUT"))
        .and(path("/test.txt"))
        .and(header("content-length", "12"))
        .and(body_string("file content"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let local_file = NamedTempFile::new().unwrap();
    std::fs::write(local_file.path(), b"file content").unwrap();

    let client = create_client(&server);
    client.upload_file("test.txt", local_file.path()).await.unwrap();
}

#[tokio::test]
async fn test_upload_missing_local_file() {
    let server = MockServer::start().await;
    let client = create_client(&server);
    let result = client
        .upload_file("test.txt", std::path::Path::new("/nonexistent/file.txt"))
        .await;
    assert!(matches!(result, Err(WebDavError::LocalResourceNotFound { .. })));
}

#[tokio::test]
async fn test_upload_rejects_files_over_size_limit() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let local_file = NamedTempFile::new().unwrap();
    local_file
        .as_file()
        .set_len(davsync::services::webdav::MAX_UPLOAD_SIZE + 1)
        .unwrap();

    let client = create_client(&server);
    let result = client.upload_file("big.bin", local_file.path()).await;
    assert!(matches!(result, Err(WebDavError::ResourceTooBig { .. })));
}

#[tokio::test]
async fn test_download_to_buffer() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("PROPFIND"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(207)
                .set_body_string(multistatus(&[("/", true), ("/test.txt", false)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/test.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("remote content"))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&server);
    let content = client.download_to_buffer("test.txt").await.unwrap();
    assert_eq!(content, b"remote content");
}

#[tokio::test]
async fn test_download_missing_file_leaves_no_local_directories() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("nested");

    let client = create_client(&server);
    let result = client.download_file("missing.txt", &nested.join("missing.txt")).await;
    assert!(matches!(result, Err(WebDavError::RemoteResourceNotFound { .. })));
    assert!(!nested.exists());
}

#[tokio::test]
async fn test_download_async_runs_callback() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("PROPFIND"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(207)
                .set_body_string(multistatus(&[("/", true), ("/test.txt", false)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/test.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("remote content"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let local_path = temp_dir.path().join("nested").join("test.txt");
    let called = Arc::new(AtomicBool::new(false));
    let called_in_callback = called.clone();

    let client = create_client(&server);
    let handle = client.download_async(
        "test.txt",
        &local_path,
        Some(move |result: &davsync::Result<()>| {
            called_in_callback.store(result.is_ok(), Ordering::SeqCst);
        }),
    );
    handle.await.unwrap().unwrap();

    assert!(called.load(Ordering::SeqCst));
    assert_eq!(std::fs::read(&local_path).unwrap(), b"remote content");
}

#[tokio::test]
async fn test_move_sends_destination_and_overwrite() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("MOVE"))
        .and(path("/a.txt"))
        .and(header("destination", format!("{}/dir/b.txt", server.uri()).as_str()))
        .and(header("overwrite", "F"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&server);
    client.move_to("a.txt", "dir/b.txt", false).await.unwrap();
}

#[tokio::test]
async fn test_copy_file_omits_depth() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("PROPFIND"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(207)
                .set_body_string(multistatus(&[("/", true), ("/a.txt", false)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("COPY"))
        .and(path("/a.txt"))
        .and(header("destination", format!("{}/b.txt", server.uri()).as_str()))
        .and(|request: &Request| !request.headers.contains_key("depth"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&server);
    client.copy("a.txt", "b.txt", Depth::Infinity).await.unwrap();
}

#[tokio::test]
async fn test_copy_directory_sends_depth() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("PROPFIND"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(207)
                .set_body_string(multistatus(&[("/", true), ("/src/", true)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("COPY"))
        .and(path("/src/"))
        .and(header("depth", "1"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&server);
    client.copy("src/", "dst/", Depth::One).await.unwrap();
}

#[tokio::test]
async fn test_copy_missing_source() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let result = client.copy("a.txt", "b.txt", Depth::Infinity).await;
    assert!(matches!(result, Err(WebDavError::RemoteResourceNotFound { .. })));
}

#[tokio::test]
async fn test_info_fields() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("PROPFIND"))
        .and(path("/test_dir/test.txt"))
        .and(header("depth", "1"))
        .respond_with(ResponseTemplate::new(207).set_body_string(
            r#"<?xml version="1.0" encoding="utf-8"?><d:multistatus xmlns:d="DAV:"><d:response>
               <d:href>/test_dir/test.txt</d:href><d:propstat><d:prop>
               <d:creationdate>2017-10-18T15:16:04Z</d:creationdate>
               <d:displayname>test.txt</d:displayname>
               <d:getcontentlength>41</d:getcontentlength>
               <d:getlastmodified>Wed, 18 Oct 2017 15:16:04 GMT</d:getlastmodified>
               </d:prop></d:propstat></d:response></d:multistatus>"#,
        ))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let info = client.info("test_dir/test.txt").await.unwrap();
    assert_eq!(info.size.as_deref(), Some("41"));
    assert_eq!(info.name.as_deref(), Some("test.txt"));
    assert_eq!(info.created.as_deref(), Some("2017-10-18T15:16:04Z"));
    assert_eq!(info.modified.as_deref(), Some("Wed, 18 Oct 2017 15:16:04 GMT"));
}

#[tokio::test]
async fn test_is_dir_with_hostname_prefix() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("PROPFIND"))
        .and(path("/prefix/"))
        .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(&[
            ("/prefix/", true),
            ("/prefix/test_dir/", true),
            ("/prefix/test.txt", false),
        ])))
        .mount(&server)
        .await;

    let settings = ConnectionSettings::new(format!("{}/prefix", server.uri()), "user", "pass");
    let client = WebDavClient::new(settings).unwrap();
    assert!(client.is_dir("test_dir").await.unwrap());
    assert!(!client.is_dir("test.txt").await.unwrap());
}

#[tokio::test]
async fn test_is_dir_with_root() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("PROPFIND"))
        .and(path("/remote.php/webdav/"))
        .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(&[
            ("/remote.php/webdav/", true),
            ("/remote.php/webdav/docs/", true),
        ])))
        .mount(&server)
        .await;

    let settings =
        ConnectionSettings::new(server.uri(), "user", "pass").with_root("/remote.php/webdav/");
    let client = WebDavClient::new(settings).unwrap();
    assert!(client.is_dir("docs").await.unwrap());
}

#[tokio::test]
async fn test_get_property() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("PROPFIND"))
        .and(path("/test.txt"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string(
            "<?xml version='1.0' encoding='UTF-8'?>\n<propfind xmlns=\"DAV:\"><prop>\
             <aProperty xmlns=\"test\"/></prop></propfind>",
        ))
        .respond_with(ResponseTemplate::new(207).set_body_string(
            r#"<?xml version="1.0"?><d:multistatus xmlns:d="DAV:"><d:response>
               <d:href>/test.txt</d:href>
               <d:propstat><d:prop><x:aProperty xmlns:x="test">aValue</x:aProperty></d:prop>
               </d:propstat></d:response></d:multistatus>"#,
        ))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let option = PropertyOption::new("aProperty").with_namespace("test");
    assert_eq!(
        client.get_property("test.txt", &option).await.unwrap().as_deref(),
        Some("aValue")
    );
}

#[tokio::test]
async fn test_set_property_batch() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("PROPPATCH"))
        .and(path("/test.txt"))
        .and(body_string(
            "<?xml version='1.0' encoding='UTF-8'?>\n<propertyupdate xmlns=\"DAV:\"><set><prop>\
             <aProperty xmlns=\"test\">aValue</aProperty><aProperty2 xmlns=\"test2\">aValue2\
             </aProperty2></prop></set></propertyupdate>",
        ))
        .respond_with(ResponseTemplate::new(207))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&server);
    let options = vec![
        PropertyOption::new("aProperty").with_namespace("test").with_value("aValue"),
        PropertyOption::new("aProperty2").with_namespace("test2").with_value("aValue2"),
    ];
    client.set_property_batch("test.txt", &options).await.unwrap();
}

#[tokio::test]
async fn test_response_classification() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/full.txt"))
        .respond_with(ResponseTemplate::new(507))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/missing.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/locked.txt"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/broken.txt"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let client = create_client(&server);
    assert!(matches!(client.clean("full.txt").await, Err(WebDavError::NotEnoughSpace)));
    assert!(matches!(
        client.clean("missing.txt").await,
        Err(WebDavError::RemoteResourceNotFound { .. })
    ));
    assert!(matches!(
        client.clean("locked.txt").await,
        Err(WebDavError::MethodNotSupported { .. })
    ));
    match client.clean("broken.txt").await {
        Err(WebDavError::ResponseErrorCode { code, message, url }) => {
            assert_eq!(code, 502);
            assert_eq!(message, "Service Unavailable");
            assert!(url.ends_with("/broken.txt"));
        }
        other => panic!("expected ResponseErrorCode, got {:?}", other),
    }
}

#[tokio::test]
async fn test_resource_rename_rebinds_handle() {
    let server = MockServer::start().await;
    mount_existing(&server).await;
    Mock::given(method("MOVE"))
        .and(path("/dir/old.txt"))
        .and(header("destination", format!("{}/dir/new.txt", server.uri()).as_str()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&server);
    let mut resource = client.resource("dir/old.txt");
    assert_eq!(resource.to_string(), "resource /dir/old.txt");

    resource.rename("new.txt").await.unwrap();
    assert_eq!(resource.path(), "/dir/new.txt");
}

#[tokio::test]
async fn test_resource_info_fields_rejects_unknown_key() {
    let server = MockServer::start().await;
    let client = create_client(&server);
    let result = client.resource("test.txt").info_fields(&["size", "owner"]).await;
    assert!(matches!(result, Err(WebDavError::OptionNotValid { .. })));
}

/// PROPFIND answer for a single file, with an optional `getlastmodified`
fn file_info(href: &str, modified: Option<&str>) -> String {
    let modified = modified
        .map(|value| format!("<d:getlastmodified>{}</d:getlastmodified>", value))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><d:multistatus xmlns:d="DAV:"><d:response>
         <d:href>{}</d:href><d:propstat><d:prop><d:resourcetype/>
         <d:getcontentlength>41</d:getcontentlength>{}</d:prop>
         <d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response></d:multistatus>"#,
        href, modified
    )
}

/// Remote `/remote/` collection holding `a.txt`, whose info reports `modified`
async fn mount_remote_with_file(server: &MockServer, modified: Option<&str>) {
    mount_existing(server).await;
    Mock::given(method("PROPFIND"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(207)
                .set_body_string(multistatus(&[("/", true), ("/remote/", true)])),
        )
        .mount(server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(path("/remote/"))
        .respond_with(ResponseTemplate::new(207).set_body_string(multistatus(&[
            ("/remote/", true),
            ("/remote/a.txt", false),
        ])))
        .mount(server)
        .await;
    Mock::given(method("PROPFIND"))
        .and(path("/remote/a.txt"))
        .respond_with(
            ResponseTemplate::new(207).set_body_string(file_info("/remote/a.txt", modified)),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_push_skips_file_with_unparsable_remote_date() {
    let server = MockServer::start().await;
    mount_remote_with_file(&server, Some("yesterday")).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let local = TempDir::new().unwrap();
    std::fs::write(local.path().join("a.txt"), b"local content").unwrap();

    let client = create_client(&server);
    assert!(!client.push("remote", local.path()).await.unwrap());
}

#[tokio::test]
async fn test_pull_skips_file_without_remote_date() {
    let server = MockServer::start().await;
    mount_remote_with_file(&server, None).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("remote content"))
        .expect(0)
        .mount(&server)
        .await;

    let local = TempDir::new().unwrap();
    std::fs::write(local.path().join("a.txt"), b"local content").unwrap();

    let client = create_client(&server);
    assert!(!client.pull("remote", local.path()).await.unwrap());
    assert_eq!(std::fs::read(local.path().join("a.txt")).unwrap(), b"local content");
}

use std::io::Cursor;

use crate::core::converter::ConversionExecutor;
use crate::core::dimensions::{self, Dimensions};
use crate::core::error::PipelineError;
use crate::core::naming;
use crate::core::plan::{RawParameters, VariantPlan};
use crate::core::store::AssetStore;
use crate::core::tempfiles::TempFileManager;

/// The caller-supplied upload. The pipeline only ever borrows it, so the
/// caller's copy is byte-for-byte identical after the run no matter how the
/// run ends.
#[derive(Debug, Clone)]
pub struct SourceAsset {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Name and bytes of the upload as they were at pipeline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSnapshot {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl AssetSnapshot {
    fn of(asset: &SourceAsset) -> Self {
        Self {
            name: asset.name.clone(),
            bytes: asset.bytes.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PersistedVariant {
    pub name: String,
    pub dimensions: Dimensions,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct PipelineReport {
    /// The untouched entry snapshot, handed back to the caller.
    pub source: AssetSnapshot,
    pub original_dimensions: Dimensions,
    pub variants: Vec<PersistedVariant>,
}

/// Sequences one synchronous conversion run: stage the source, produce and
/// persist the base variant, then each additional variant strictly in request
/// order. Temp handles are scoped to the run and released on every exit path.
///
/// Variants persisted before a later step fails are not retracted; external
/// persistence is not transactional with the pipeline.
pub struct ConversionPipeline {
    executor: ConversionExecutor,
    temp: TempFileManager,
}

impl ConversionPipeline {
    pub fn new(executor: ConversionExecutor, temp: TempFileManager) -> Self {
        Self { executor, temp }
    }

    pub fn executor(&self) -> &ConversionExecutor {
        &self.executor
    }

    pub async fn run(
        &self,
        asset: &SourceAsset,
        params: &RawParameters,
        store: &dyn AssetStore,
    ) -> Result<PipelineReport, PipelineError> {
        let snapshot = AssetSnapshot::of(asset);
        let plan = VariantPlan::build(params)?;
        let original = decode_dimensions(&asset.bytes)?;
        let stem = naming::stem_of(&asset.name);

        tracing::info!(
            "converting {:?} ({original}, quality {}, {} additional variant(s))",
            asset.name,
            plan.quality,
            plan.requests.len()
        );

        // Lives for the whole run; every output slot below is scoped to one
        // variant's convert-and-persist step.
        let source = self.temp.acquire_source(&stem, &asset.bytes)?;

        let mut variants = Vec::with_capacity(plan.requests.len() + 1);

        // Base variant: quality-only re-encode at the original size.
        {
            let slot = self.temp.acquire_output_slot(&stem)?;
            let bytes = self
                .executor
                .convert(source.path(), slot.path(), plan.quality, None)
                .await?;
            let name = naming::base_name(&stem);
            store.create(&name, &bytes).await?;
            tracing::info!("persisted base variant {name} at {original}");
            variants.push(PersistedVariant {
                name,
                dimensions: original,
                bytes,
            });
        }

        for request in &plan.requests {
            // Each request resolves against the original dimensions, never a
            // previous variant's.
            let dims = dimensions::resolve(original, request.width_spec, request.height_spec)?;
            let slot = self.temp.acquire_output_slot(&stem)?;
            let bytes = self
                .executor
                .convert(source.path(), slot.path(), plan.quality, Some(dims))
                .await?;
            let name = naming::variant_name(&stem, dims);
            store.create(&name, &bytes).await?;
            tracing::info!("persisted variant {} of {}: {name}", request.index + 1, plan.requests.len());
            variants.push(PersistedVariant {
                name,
                dimensions: dims,
                bytes,
            });
        }

        Ok(PipelineReport {
            source: snapshot,
            original_dimensions: original,
            variants,
        })
    }
}

/// Dimension discovery only; all pixel re-encoding is the converter's job.
fn decode_dimensions(bytes: &[u8]) -> Result<Dimensions, PipelineError> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(PipelineError::Io)?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(PipelineError::UnsupportedImageType)?;
    Ok(Dimensions::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::converter::DEFAULT_DEADLINE;
    use crate::core::error::ConversionError;
    use crate::core::store::MemoryAssetStore;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    fn stub_converter(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("cwebp-stub.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    const COPY_BODY: &str = r#"
src=""
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    -q) shift ;;
    -resize) shift; shift ;;
    -o) shift; out="$1" ;;
    *) src="$1" ;;
  esac
  shift
done
cp "$src" "$out"
"#;

    /// Copies only when no resize directive is present, so every additional
    /// variant ends in an empty output file.
    const BASE_ONLY_BODY: &str = r#"
src=""
out=""
resize=0
while [ $# -gt 0 ]; do
  case "$1" in
    -q) shift ;;
    -resize) resize=1; shift; shift ;;
    -o) shift; out="$1" ;;
    *) src="$1" ;;
  esac
  shift
done
if [ "$resize" -eq 0 ]; then
  cp "$src" "$out"
fi
"#;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([12, 34, 56, 255]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn pipeline(dir: &Path, body: &str) -> ConversionPipeline {
        let bin = stub_converter(dir, body);
        ConversionPipeline::new(
            ConversionExecutor::new(bin, DEFAULT_DEADLINE),
            TempFileManager::new(dir.join("tmp")),
        )
    }

    fn temp_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir.join("tmp")).unwrap().count()
    }

    #[tokio::test]
    async fn end_to_end_produces_base_and_resized_variant() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("tmp")).unwrap();
        let pipeline = pipeline(dir.path(), COPY_BODY);
        let store = MemoryAssetStore::new();

        let asset = SourceAsset {
            name: "name.jpg".to_string(),
            bytes: png_bytes(800, 600),
        };
        let params = RawParameters {
            num_additional_images: Some("1".to_string()),
            widths: Some("400".to_string()),
            heights: Some("".to_string()),
            ..Default::default()
        };

        let report = pipeline.run(&asset, &params, &store).await.unwrap();

        assert_eq!(report.original_dimensions, Dimensions::new(800, 600));
        assert_eq!(report.variants.len(), 2);
        assert_eq!(report.variants[0].name, "name.webp");
        assert_eq!(report.variants[0].dimensions, Dimensions::new(800, 600));
        assert_eq!(report.variants[1].name, "name-400x300.webp");
        assert_eq!(report.variants[1].dimensions, Dimensions::new(400, 300));
        assert_eq!(store.names(), vec!["name.webp", "name-400x300.webp"]);

        // caller's asset is untouched and the snapshot echoes it
        assert_eq!(report.source.name, asset.name);
        assert_eq!(report.source.bytes, asset.bytes);

        // both the source handle and every output slot released
        assert_eq!(temp_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn rerunning_persists_a_second_instance_per_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("tmp")).unwrap();
        let pipeline = pipeline(dir.path(), COPY_BODY);
        let store = MemoryAssetStore::new();

        let asset = SourceAsset {
            name: "photo.png".to_string(),
            bytes: png_bytes(10, 10),
        };
        let params = RawParameters::default();

        pipeline.run(&asset, &params, &store).await.unwrap();
        pipeline.run(&asset, &params, &store).await.unwrap();

        // deterministic naming, create-new-instance collision policy
        assert_eq!(store.names(), vec!["photo.webp", "photo.webp"]);
    }

    #[tokio::test]
    async fn missing_converter_output_fails_without_stale_bytes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("tmp")).unwrap();
        let pipeline = pipeline(dir.path(), BASE_ONLY_BODY);
        let store = MemoryAssetStore::new();

        let asset = SourceAsset {
            name: "photo.png".to_string(),
            bytes: png_bytes(64, 48),
        };
        let params = RawParameters {
            num_additional_images: Some("1".to_string()),
            widths: Some("32".to_string()),
            ..Default::default()
        };

        let err = pipeline.run(&asset, &params, &store).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Conversion(ConversionError::OutputMissing { .. })
        ));

        // the base variant persisted before the failure stays persisted
        assert_eq!(store.names(), vec!["photo.webp"]);
        // cleanup still ran on the error path
        assert_eq!(temp_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn undecodable_upload_is_unsupported_image_type() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("tmp")).unwrap();
        let pipeline = pipeline(dir.path(), COPY_BODY);
        let store = MemoryAssetStore::new();

        let asset = SourceAsset {
            name: "notes.txt".to_string(),
            bytes: b"definitely not an image".to_vec(),
        };

        let err = pipeline
            .run(&asset, &RawParameters::default(), &store)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedImageType(_)));
        assert!(err.is_invalid_input());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn bad_parameters_fail_before_any_conversion() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("tmp")).unwrap();
        // a converter that would fail loudly if it were ever invoked
        let pipeline = pipeline(dir.path(), "exit 9");
        let store = MemoryAssetStore::new();

        let asset = SourceAsset {
            name: "photo.png".to_string(),
            bytes: png_bytes(8, 8),
        };
        let params = RawParameters {
            quality: Some("best".to_string()),
            ..Default::default()
        };

        let err = pipeline.run(&asset, &params, &store).await.unwrap_err();
        assert!(matches!(err, PipelineError::Parameter(_)));
        assert!(store.is_empty());
    }
}

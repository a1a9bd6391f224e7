// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod common;

use ash::vk;
use ash::vk::Handle;

use common::{COMPUTE, FRAGMENT, Module, ShaderStore, VERTEX};
use prism_lib::assets::AssetDirs;
use prism_lib::prelude::*;
use prism_lib::vulkan::barrier::{ImageState, ImageTracker};
use prism_lib::vulkan::capacity::PersistedCapacity;
use prism_lib::vulkan::descriptors::DescriptorCounts;
use prism_lib::vulkan::headless::HeadlessDevice;
use prism_lib::vulkan::layout::LayoutSet;
use prism_lib::vulkan::set::{DescriptorPayload, DescriptorWrites};

const CONFIG: &str = r#"
[[pipeline]]
name = "forward"
shaders = ["scene.vert", "forward.frag"]

[[pipeline]]
name = "deferred"
shaders = ["scene.vert", "deferred.frag"]
"#;

fn shaders() -> ShaderStore {
    ShaderStore::default()
        .with(
            "scene.vert",
            Module::new(VERTEX).uniform_buffer(0, 0, "camera").finish(),
        )
        .with(
            "forward.frag",
            Module::new(FRAGMENT)
                .combined_sampler(1, 0, "materials", 3)
                .push_constants(0)
                .finish(),
        )
        .with(
            "deferred.frag",
            Module::new(FRAGMENT)
                .uniform_buffer(0, 0, "camera")
                .storage_buffer(1, 0, "lights")
                .finish(),
        )
}

fn layouts(store: &mut ShaderStore) -> LayoutSet {
    let config = RendererConfig::parse(CONFIG).unwrap();
    PipelineCatalog::new()
        .build_with(&config, |name| store.load(name))
        .unwrap()
}

fn counts(sets: u32, kinds: &[(DescriptorKind, u32)]) -> DescriptorCounts {
    let mut counts = DescriptorCounts::with_sets(sets);
    for &(kind, n) in kinds {
        counts[kind] = n;
    }
    counts
}

#[test]
fn test_shared_layouts_from_config() {
    let mut store = shaders();
    let set = layouts(&mut store);

    assert_eq!(store.loads["scene.vert"], 1);
    assert_eq!(set.layouts().len(), 3);

    let forward = set.pipeline_layouts("forward").unwrap();
    let deferred = set.pipeline_layouts("deferred").unwrap();
    assert_eq!(forward[0], deferred[0]);
    assert_ne!(forward[1], deferred[1]);

    let camera = set.layout(forward[0]).unwrap();
    assert_eq!(camera.users().len(), 2);
    assert_eq!(
        camera.bindings()[0].stages,
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
    assert_eq!(
        set.layout(forward[1]).unwrap().bindings()[0].count,
        3
    );

    let push = set.push_constant_range("forward").unwrap();
    assert_eq!((push.offset, push.size), (0, 16));
    assert_eq!(push.stages, vk::ShaderStageFlags::FRAGMENT);
    assert!(set.push_constant_range("deferred").unwrap().is_empty());
}

#[test]
fn test_catalog_reflects_each_shader_once() {
    let mut store = shaders();
    let config = RendererConfig::parse(CONFIG).unwrap();
    let mut catalog = PipelineCatalog::new();
    catalog
        .build_with(&config, |name| store.load(name))
        .unwrap();
    catalog
        .build_with(&config, |name| store.load(name))
        .unwrap();

    assert_eq!(catalog.len(), 3);
    assert!(store.loads.values().all(|&n| n == 1));
    let entry = ShaderEntry::File("forward.frag".to_owned());
    assert_eq!(catalog.reflection(&entry).unwrap().bindings.len(), 1);
}

#[test]
fn test_mismatched_stages_fail_the_build() {
    let mut store = ShaderStore::default()
        .with(
            "blit.vert",
            Module::new(VERTEX).uniform_buffer(0, 0, "params").finish(),
        )
        .with(
            "blit.frag",
            Module::new(FRAGMENT).storage_buffer(0, 0, "params").finish(),
        );
    let config = RendererConfig::parse(
        r#"
[[pipeline]]
name = "blit"
shaders = ["blit.vert", "blit.frag"]
"#,
    )
    .unwrap();
    let result = PipelineCatalog::new().build_with(&config, |name| store.load(name));
    assert!(matches!(
        result,
        Err(PrismError::Config(ConfigError::BindingMismatch { set: 0, binding: 0, .. }))
    ));
}

#[test]
fn test_shader_errors_name_the_file() {
    // A compute module configured as a fragment shader.
    let mut store = ShaderStore::default().with(
        "blur.frag",
        Module::new(COMPUTE).storage_image(0, 0, "target").finish(),
    );
    let config = RendererConfig::parse(
        r#"
[[pipeline]]
name = "blur"
shaders = ["blur.frag"]

[[pipeline]]
name = "missing"
shaders = ["missing.comp"]
"#,
    )
    .unwrap();

    match PipelineCatalog::new().build_with(&config, |name| store.load(name)) {
        Err(PrismError::Shader { file, source }) => {
            assert_eq!(file, "blur.frag");
            assert!(matches!(source, ConfigError::MalformedShader(_)));
        }
        other => panic!("expected a shader error, got {:?}", other.map(|_| ())),
    }

    let mut store = ShaderStore::default();
    assert!(matches!(
        PipelineCatalog::new().build_with(&config, |name| store.load(name)),
        Err(PrismError::Asset(_))
    ));
}

#[test]
fn test_build_from_asset_dirs() {
    let root = tempfile::tempdir().unwrap();
    common::write_shader(
        root.path(),
        "scene.vert",
        &Module::new(VERTEX).uniform_buffer(0, 0, "camera").finish(),
    );
    common::write_shader(
        root.path(),
        "forward.frag",
        &Module::new(FRAGMENT)
            .combined_sampler(1, 0, "materials", 3)
            .finish(),
    );
    common::write_shader(
        root.path(),
        "deferred.frag",
        &Module::new(FRAGMENT).storage_buffer(1, 0, "lights").finish(),
    );

    let assets = AssetDirs::with_roots([root.path().to_owned()]);
    let config = RendererConfig::parse(CONFIG).unwrap();
    let set = PipelineCatalog::new().build(&config, &assets).unwrap();
    assert_eq!(set.pipelines().collect::<Vec<_>>(), ["deferred", "forward"]);
    assert_eq!(set.layouts().len(), 3);
}

#[test]
fn test_capacity_persists_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let capacity_file = dir.path().join("cache").join("capacity.txt");
    let mut store = shaders();

    // Cold start: one exact pool per batch.
    let device = HeadlessDevice::new();
    let mut core = DescriptorCore::startup(&device, layouts(&mut store), &capacity_file).unwrap();
    assert!(core.allocator().pools().is_empty());
    let forward = core.allocate_pipeline(&device, "forward").unwrap();
    let deferred = core.allocate_pipeline(&device, "deferred").unwrap();
    assert_eq!(forward.len(), 2);
    assert_eq!(deferred.len(), 2);
    assert_eq!(forward[0].layout(), deferred[0].layout());
    assert_eq!(
        device.created_pools(),
        [
            counts(
                2,
                &[
                    (DescriptorKind::UniformBuffer, 1),
                    (DescriptorKind::CombinedImageSampler, 3)
                ]
            ),
            counts(
                2,
                &[
                    (DescriptorKind::UniformBuffer, 1),
                    (DescriptorKind::StorageBuffer, 1)
                ]
            ),
        ]
    );

    let totals = counts(
        4,
        &[
            (DescriptorKind::UniformBuffer, 2),
            (DescriptorKind::CombinedImageSampler, 3),
            (DescriptorKind::StorageBuffer, 1),
        ],
    );
    let persisted = core.shutdown(&device).unwrap().unwrap();
    assert_eq!(persisted.counts, totals);
    assert_eq!(device.live_pools(), 0);
    assert_eq!(device.live_set_layouts(), 0);
    assert_eq!(PersistedCapacity::load(&capacity_file).unwrap(), persisted);

    // Warm start: a single pool already big enough for the same frame.
    let device = HeadlessDevice::new();
    let mut core = DescriptorCore::startup(&device, layouts(&mut store), &capacity_file).unwrap();
    assert_eq!(core.allocator().pools().len(), 1);
    assert_eq!(core.allocator().remaining(), totals);
    core.allocate_pipeline(&device, "forward").unwrap();
    core.allocate_pipeline(&device, "deferred").unwrap();
    assert_eq!(device.created_pools(), [totals]);
    assert!(core.allocator().remaining().is_empty());
    core.shutdown(&device).unwrap();
}

#[test]
fn test_unused_core_leaves_capacity_file_alone() {
    let dir = tempfile::tempdir().unwrap();
    let capacity_file = dir.path().join("capacity.txt");
    std::fs::write(&capacity_file, "NumSets 7\nUniformBuffer 7\n").unwrap();

    let device = HeadlessDevice::new();
    let core = DescriptorCore::startup(&device, layouts(&mut shaders()), &capacity_file).unwrap();
    assert_eq!(core.allocator().capacity().sets, 7);
    assert!(core.shutdown(&device).unwrap().is_none());
    assert_eq!(
        std::fs::read_to_string(&capacity_file).unwrap(),
        "NumSets 7\nUniformBuffer 7\n"
    );
}

#[test]
fn test_corrupt_capacity_file_starts_cold() {
    let dir = tempfile::tempdir().unwrap();
    let capacity_file = dir.path().join("capacity.txt");
    std::fs::write(&capacity_file, "NumSets lots\n").unwrap();

    let device = HeadlessDevice::new();
    let mut core =
        DescriptorCore::startup(&device, layouts(&mut shaders()), &capacity_file).unwrap();
    assert!(core.allocator().pools().is_empty());
    core.allocate(&device, "forward", 0).unwrap();
    core.shutdown(&device).unwrap();

    let rewritten = PersistedCapacity::load(&capacity_file).unwrap();
    assert_eq!(
        rewritten.counts,
        counts(1, &[(DescriptorKind::UniformBuffer, 1)])
    );
}

#[test]
fn test_unknown_pipeline_and_set() {
    let dir = tempfile::tempdir().unwrap();
    let device = HeadlessDevice::new();
    let mut core = DescriptorCore::startup(
        &device,
        layouts(&mut shaders()),
        dir.path().join("capacity.txt"),
    )
    .unwrap();

    assert!(matches!(
        core.allocate(&device, "shadow", 0),
        Err(PrismError::Config(ConfigError::UnknownPipeline(_)))
    ));
    assert!(matches!(
        core.allocate(&device, "forward", 2),
        Err(PrismError::Config(ConfigError::UnknownLayout(_)))
    ));
    assert!(matches!(
        core.allocate_batch(&device, &[("forward", 0), ("shadow", 0)]),
        Err(PrismError::Config(ConfigError::UnknownPipeline(_)))
    ));
    assert!(core.allocator().pools().is_empty());
    core.shutdown(&device).unwrap();
}

#[test]
fn test_shutdown_after_failed_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capacity.txt");
    let device = HeadlessDevice::new();
    let mut core = DescriptorCore::startup(&device, layouts(&mut shaders()), &path).unwrap();

    core.allocate_pipeline(&device, "forward").unwrap();
    assert!(matches!(
        core.allocate_pipeline(&device, "shadow"),
        Err(PrismError::Config(ConfigError::UnknownPipeline(_)))
    ));
    assert_eq!(device.live_pools(), 1);

    // What was allocated before the failure is still persisted.
    let persisted = core.shutdown(&device).unwrap().unwrap();
    assert_eq!(device.live_pools(), 0);
    assert_eq!(device.live_set_layouts(), 0);
    assert_eq!(PersistedCapacity::load(&path), Some(persisted));
}

#[test]
fn test_pipeline_layout_from_core() {
    let dir = tempfile::tempdir().unwrap();
    let device = HeadlessDevice::new();
    let core = DescriptorCore::startup(
        &device,
        layouts(&mut shaders()),
        dir.path().join("capacity.txt"),
    )
    .unwrap();

    let layout = core
        .layouts()
        .create_pipeline_layout(&device, "forward")
        .unwrap();
    assert_eq!(device.live_pipeline_layouts(), 1);
    device.destroy_pipeline_layout(layout);
    core.shutdown(&device).unwrap();
    assert_eq!(device.live_pipeline_layouts(), 0);
}

#[test]
fn test_tracked_images_write_matching_kinds() {
    let dir = tempfile::tempdir().unwrap();
    let device = HeadlessDevice::new();
    let mut core = DescriptorCore::startup(
        &device,
        layouts(&mut shaders()),
        dir.path().join("capacity.txt"),
    )
    .unwrap();
    let materials = core.allocate(&device, "forward", 1).unwrap();
    let cmd = vk::CommandBuffer::from_raw(1);
    let sampler = vk::Sampler::from_raw(99);

    let mut textures: Vec<ImageTracker> = (1..=3)
        .map(|i| {
            ImageTracker::new(
                vk::Image::from_raw(i),
                vk::ImageView::from_raw(10 + i),
                vk::Format::R8G8B8A8_SRGB,
                1,
                1,
            )
        })
        .collect();
    for texture in &mut textures {
        texture.set_sampler(Some(sampler));
        assert!(texture.transition_to(&device, cmd, ImageState::TRANSFER_DST));
        assert!(texture.transition_to(&device, cmd, ImageState::SHADER_READ));
    }
    assert_eq!(device.barriers().len(), 6);

    let bindings: Vec<_> = textures.iter().map(|t| *t.binding()).collect();
    DescriptorWrites::new()
        .write_array(&materials, 0, 0, &bindings)
        .unwrap()
        .submit(&device);

    let writes = device.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].kind, DescriptorKind::CombinedImageSampler);
    match &writes[0].payload {
        DescriptorPayload::Images(infos) => {
            assert_eq!(infos.len(), 3);
            assert!(infos.iter().all(|i| {
                i.image_layout == vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL && i.sampler == sampler
            }));
        }
        other => panic!("expected image payload, got {other:?}"),
    }

    // One texture moves to storage use and no longer fits the sampled array.
    assert!(textures[2].transition_layout(&device, cmd, vk::ImageLayout::GENERAL));
    assert_eq!(textures[2].binding().kind(), DescriptorKind::StorageImage);
    let bindings: Vec<_> = textures.iter().map(|t| *t.binding()).collect();
    assert!(matches!(
        DescriptorWrites::new().write_array(&materials, 0, 0, &bindings),
        Err(ConfigError::MixedArrayWrite {
            first: DescriptorKind::CombinedImageSampler,
            second: DescriptorKind::StorageImage,
            ..
        })
    ));

    core.shutdown(&device).unwrap();
}

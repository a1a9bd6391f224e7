// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hand-assembled SPIR-V modules for integration tests.  Each module has one empty `main` and
//! declares resources without using them.

#![allow(dead_code)]

use std::collections::HashMap;

use prism_lib::assets::AssetError;

const MAGIC: u32 = 0x0723_0203;

const OP_NAME: u32 = 5;
const OP_MEMORY_MODEL: u32 = 14;
const OP_ENTRY_POINT: u32 = 15;
const OP_EXECUTION_MODE: u32 = 16;
const OP_CAPABILITY: u32 = 17;
const OP_TYPE_VOID: u32 = 19;
const OP_TYPE_INT: u32 = 21;
const OP_TYPE_FLOAT: u32 = 22;
const OP_TYPE_VECTOR: u32 = 23;
const OP_TYPE_IMAGE: u32 = 25;
const OP_TYPE_SAMPLED_IMAGE: u32 = 27;
const OP_TYPE_ARRAY: u32 = 28;
const OP_TYPE_STRUCT: u32 = 30;
const OP_TYPE_POINTER: u32 = 32;
const OP_TYPE_FUNCTION: u32 = 33;
const OP_CONSTANT: u32 = 43;
const OP_FUNCTION: u32 = 54;
const OP_FUNCTION_END: u32 = 56;
const OP_VARIABLE: u32 = 59;
const OP_DECORATE: u32 = 71;
const OP_MEMBER_DECORATE: u32 = 72;
const OP_LABEL: u32 = 248;
const OP_RETURN: u32 = 253;

const DECORATION_BLOCK: u32 = 2;
const DECORATION_BINDING: u32 = 33;
const DECORATION_DESCRIPTOR_SET: u32 = 34;
const DECORATION_OFFSET: u32 = 35;

const STORAGE_UNIFORM_CONSTANT: u32 = 0;
const STORAGE_UNIFORM: u32 = 2;
const STORAGE_PUSH_CONSTANT: u32 = 9;
const STORAGE_STORAGE_BUFFER: u32 = 12;

pub const VERTEX: u32 = 0;
pub const FRAGMENT: u32 = 4;
pub const COMPUTE: u32 = 5;

fn emit(words: &mut Vec<u32>, opcode: u32, operands: &[u32]) {
    words.push(((operands.len() as u32 + 1) << 16) | opcode);
    words.extend_from_slice(operands);
}

pub struct Module {
    execution_model: u32,
    bound: u32,
    debug: Vec<u32>,
    annotations: Vec<u32>,
    types: Vec<u32>,
    float: Option<u32>,
}

impl Module {
    /// A module with one entry point of `execution_model`.  Id 1 is `main`.
    pub fn new(execution_model: u32) -> Self {
        Self {
            execution_model,
            bound: 1,
            debug: Vec::new(),
            annotations: Vec::new(),
            types: Vec::new(),
            float: None,
        }
    }

    fn id(&mut self) -> u32 {
        self.bound += 1;
        self.bound
    }

    fn float(&mut self) -> u32 {
        if let Some(float) = self.float {
            return float;
        }
        let float = self.id();
        emit(&mut self.types, OP_TYPE_FLOAT, &[float, 32]);
        self.float = Some(float);
        float
    }

    fn variable(&mut self, pointee: u32, storage: u32) -> u32 {
        let ptr = self.id();
        emit(&mut self.types, OP_TYPE_POINTER, &[ptr, storage, pointee]);
        let var = self.id();
        emit(&mut self.types, OP_VARIABLE, &[ptr, var, storage]);
        var
    }

    fn bind(mut self, var: u32, set: u32, binding: u32, name: &str) -> Self {
        let mut operands = vec![var];
        operands.extend(string_words(name));
        emit(&mut self.debug, OP_NAME, &operands);
        emit(&mut self.annotations, OP_DECORATE, &[var, DECORATION_BINDING, binding]);
        emit(&mut self.annotations, OP_DECORATE, &[var, DECORATION_DESCRIPTOR_SET, set]);
        self
    }

    /// A struct of `member` at `offset`, decorated `Block`.
    fn block(&mut self, member: u32, offset: u32) -> u32 {
        let block = self.id();
        emit(&mut self.types, OP_TYPE_STRUCT, &[block, member]);
        emit(&mut self.annotations, OP_DECORATE, &[block, DECORATION_BLOCK]);
        emit(
            &mut self.annotations,
            OP_MEMBER_DECORATE,
            &[block, 0, DECORATION_OFFSET, offset],
        );
        block
    }

    fn image(&mut self, sampled: u32, format: u32) -> u32 {
        let float = self.float();
        let image = self.id();
        emit(
            &mut self.types,
            OP_TYPE_IMAGE,
            &[image, float, 1, 0, 0, 0, sampled, format],
        );
        image
    }

    pub fn uniform_buffer(mut self, set: u32, binding: u32, name: &str) -> Self {
        let float = self.float();
        let block = self.block(float, 0);
        let var = self.variable(block, STORAGE_UNIFORM);
        self.bind(var, set, binding, name)
    }

    pub fn storage_buffer(mut self, set: u32, binding: u32, name: &str) -> Self {
        let float = self.float();
        let block = self.block(float, 0);
        let var = self.variable(block, STORAGE_STORAGE_BUFFER);
        self.bind(var, set, binding, name)
    }

    /// `count` of 1 declares a plain `sampler2D`, more declares an array.
    pub fn combined_sampler(mut self, set: u32, binding: u32, name: &str, count: u32) -> Self {
        let image = self.image(1, 0);
        let sampled = self.id();
        emit(&mut self.types, OP_TYPE_SAMPLED_IMAGE, &[sampled, image]);
        let mut ty = sampled;
        if count > 1 {
            let int = self.id();
            emit(&mut self.types, OP_TYPE_INT, &[int, 32, 0]);
            let length = self.id();
            emit(&mut self.types, OP_CONSTANT, &[int, length, count]);
            ty = self.id();
            emit(&mut self.types, OP_TYPE_ARRAY, &[ty, sampled, length]);
        }
        let var = self.variable(ty, STORAGE_UNIFORM_CONSTANT);
        self.bind(var, set, binding, name)
    }

    /// An `rgba32f` storage image.
    pub fn storage_image(mut self, set: u32, binding: u32, name: &str) -> Self {
        let image = self.image(2, 1);
        let var = self.variable(image, STORAGE_UNIFORM_CONSTANT);
        self.bind(var, set, binding, name)
    }

    /// A `vec4` block at `offset`.
    pub fn push_constants(mut self, offset: u32) -> Self {
        let float = self.float();
        let vec4 = self.id();
        emit(&mut self.types, OP_TYPE_VECTOR, &[vec4, float, 4]);
        let block = self.block(vec4, offset);
        self.variable(block, STORAGE_PUSH_CONSTANT);
        self
    }

    pub fn finish(mut self) -> Vec<u32> {
        let main = 1;
        let void = self.id();
        emit(&mut self.types, OP_TYPE_VOID, &[void]);
        let fn_ty = self.id();
        emit(&mut self.types, OP_TYPE_FUNCTION, &[fn_ty, void]);
        let label = self.id();

        let mut words = vec![MAGIC, 0x0001_0300, 0, self.bound + 1, 0];
        emit(&mut words, OP_CAPABILITY, &[1]);
        emit(&mut words, OP_MEMORY_MODEL, &[0, 1]);
        let mut entry = vec![self.execution_model, main];
        entry.extend(string_words("main"));
        emit(&mut words, OP_ENTRY_POINT, &entry);
        match self.execution_model {
            FRAGMENT => emit(&mut words, OP_EXECUTION_MODE, &[main, 7]),
            COMPUTE => emit(&mut words, OP_EXECUTION_MODE, &[main, 17, 1, 1, 1]),
            _ => {}
        }
        words.extend(&self.debug);
        words.extend(&self.annotations);
        words.extend(&self.types);
        emit(&mut words, OP_FUNCTION, &[void, main, 0, fn_ty]);
        emit(&mut words, OP_LABEL, &[label]);
        emit(&mut words, OP_RETURN, &[]);
        emit(&mut words, OP_FUNCTION_END, &[]);
        words
    }
}

fn string_words(s: &str) -> Vec<u32> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// In-memory shader store that counts loads per file.
#[derive(Default)]
pub struct ShaderStore {
    shaders: HashMap<String, Vec<u32>>,
    pub loads: HashMap<String, usize>,
}

impl ShaderStore {
    pub fn with(mut self, name: &str, words: Vec<u32>) -> Self {
        self.shaders.insert(name.to_owned(), words);
        self
    }

    pub fn load(&mut self, name: &str) -> Result<Vec<u32>, AssetError> {
        *self.loads.entry(name.to_owned()).or_default() += 1;
        self.shaders
            .get(name)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(name.to_owned()))
    }
}

/// Writes `words` as `<root>/shaders/<name>.spv`.
pub fn write_shader(root: &std::path::Path, name: &str, words: &[u32]) {
    let dir = root.join("shaders");
    std::fs::create_dir_all(&dir).unwrap();
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_ne_bytes()).collect();
    std::fs::write(dir.join(format!("{name}.spv")), bytes).unwrap();
}

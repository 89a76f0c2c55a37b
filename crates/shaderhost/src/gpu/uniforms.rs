/// Scalar and vector uniform types the backend can place in a std140 block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UniformKind {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
}

impl UniformKind {
    pub fn parse(glsl_type: &str) -> Option<Self> {
        match glsl_type {
            "float" => Some(UniformKind::Float),
            "int" => Some(UniformKind::Int),
            "vec2" => Some(UniformKind::Vec2),
            "vec3" => Some(UniformKind::Vec3),
            "vec4" => Some(UniformKind::Vec4),
            _ => None,
        }
    }

    pub fn glsl_name(self) -> &'static str {
        match self {
            UniformKind::Float => "float",
            UniformKind::Int => "int",
            UniformKind::Vec2 => "vec2",
            UniformKind::Vec3 => "vec3",
            UniformKind::Vec4 => "vec4",
        }
    }

    pub fn components(self) -> usize {
        match self {
            UniformKind::Float | UniformKind::Int => 1,
            UniformKind::Vec2 => 2,
            UniformKind::Vec3 => 3,
            UniformKind::Vec4 => 4,
        }
    }

    fn alignment(self) -> u32 {
        match self {
            UniformKind::Float | UniformKind::Int => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 | UniformKind::Vec4 => 16,
        }
    }

    fn size(self) -> u32 {
        self.components() as u32 * 4
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformMember {
    pub name: String,
    pub kind: UniformKind,
    pub offset: u32,
}

/// Loose `uniform` declarations gathered into one std140 block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct UniformBlock {
    members: Vec<UniformMember>,
    end: u32,
}

impl UniformBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a member at the next std140-aligned offset.
    ///
    /// Redeclaring a name with the same type is accepted and ignored.
    pub fn push(&mut self, name: &str, kind: UniformKind) -> Result<(), String> {
        if let Some(existing) = self.member(name) {
            if existing.kind == kind {
                return Ok(());
            }
            return Err(format!(
                "uniform `{name}` redeclared as {} (was {})",
                kind.glsl_name(),
                existing.kind.glsl_name()
            ));
        }
        let offset = align_to(self.end, kind.alignment());
        self.end = offset + kind.size();
        self.members.push(UniformMember {
            name: name.to_string(),
            kind,
            offset,
        });
        Ok(())
    }

    pub fn member(&self, name: &str) -> Option<&UniformMember> {
        self.members.iter().find(|member| member.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Buffer size rounded up to a whole vec4.
    pub fn buffer_size(&self) -> u64 {
        u64::from(align_to(self.end.max(1), 16))
    }

    /// GLSL 450 declaration with an anonymous instance so members stay global names.
    pub fn declaration(&self, block_name: &str, binding: u32) -> String {
        let mut out = format!("layout(std140, set = 0, binding = {binding}) uniform {block_name} {{\n");
        for member in &self.members {
            out.push_str("    ");
            out.push_str(member.kind.glsl_name());
            out.push(' ');
            out.push_str(&member.name);
            out.push_str(";\n");
        }
        out.push_str("};\n");
        out
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

/// CPU copy of a uniform block, uploaded whole before each draw.
#[derive(Debug, Clone)]
pub(crate) struct UniformStaging {
    bytes: Vec<u8>,
}

impl UniformStaging {
    pub fn new(block: &UniformBlock) -> Self {
        Self {
            bytes: vec![0; block.buffer_size() as usize],
        }
    }

    /// Writes as many of `values` as `kind` holds; missing components stay untouched.
    pub fn write(&mut self, offset: u32, kind: UniformKind, values: &[f32]) {
        let count = kind.components().min(values.len());
        let start = offset as usize;
        match kind {
            UniformKind::Int => {
                if let Some(value) = values.first() {
                    self.copy_into(start, bytemuck::bytes_of(&(*value as i32)));
                }
            }
            _ => self.copy_into(start, bytemuck::cast_slice(&values[..count])),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn copy_into(&mut self, start: usize, data: &[u8]) {
        if let Some(slot) = self.bytes.get_mut(start..start + data.len()) {
            slot.copy_from_slice(data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_follow_std140_alignment() {
        let mut block = UniformBlock::new();
        block.push("portfolio_viewport", UniformKind::Vec2).unwrap();
        block.push("time", UniformKind::Float).unwrap();
        block.push("tint", UniformKind::Vec3).unwrap();
        block.push("steps", UniformKind::Int).unwrap();
        block.push("offset", UniformKind::Vec2).unwrap();
        block.push("color", UniformKind::Vec4).unwrap();

        let offsets: Vec<u32> = ["portfolio_viewport", "time", "tint", "steps", "offset", "color"]
            .iter()
            .map(|name| block.member(name).unwrap().offset)
            .collect();
        assert_eq!(offsets, vec![0, 8, 16, 28, 32, 48]);
        assert_eq!(block.buffer_size(), 64);
    }

    #[test]
    fn redeclaration_with_same_type_is_ignored() {
        let mut block = UniformBlock::new();
        block.push("speed", UniformKind::Float).unwrap();
        block.push("speed", UniformKind::Float).unwrap();
        assert_eq!(block.buffer_size(), 16);

        let err = block.push("speed", UniformKind::Vec2).unwrap_err();
        assert!(err.contains("redeclared"));
    }

    #[test]
    fn declaration_lists_members_in_order() {
        let mut block = UniformBlock::new();
        block.push("resolution", UniformKind::Vec2).unwrap();
        block.push("time", UniformKind::Float).unwrap();
        let glsl = block.declaration("Params", 1);
        assert!(glsl.starts_with("layout(std140, set = 0, binding = 1) uniform Params {"));
        assert!(glsl.contains("    vec2 resolution;\n    float time;\n"));
        assert!(glsl.ends_with("};\n"));
    }

    #[test]
    fn staging_writes_floats_and_ints() {
        let mut block = UniformBlock::new();
        block.push("resolution", UniformKind::Vec2).unwrap();
        block.push("frame", UniformKind::Int).unwrap();
        let mut staging = UniformStaging::new(&block);

        staging.write(0, UniformKind::Vec2, &[640.0, 480.0]);
        staging.write(8, UniformKind::Int, &[3.9]);
        let bytes = staging.as_bytes();
        assert_eq!(bytes.len(), 16);
        let width: f32 = bytemuck::pod_read_unaligned(&bytes[0..4]);
        let height: f32 = bytemuck::pod_read_unaligned(&bytes[4..8]);
        let frame: i32 = bytemuck::pod_read_unaligned(&bytes[8..12]);
        assert_eq!((width, height, frame), (640.0, 480.0, 3));
    }

    #[test]
    fn staging_ignores_out_of_range_writes() {
        let block = UniformBlock::new();
        let mut staging = UniformStaging::new(&block);
        staging.write(64, UniformKind::Vec4, &[1.0; 4]);
        assert!(staging.as_bytes().iter().all(|byte| *byte == 0));
    }
}

//! C++ trampolines.
//!
//! Every trampoline is an `extern "C"` function with default visibility that
//! resolves its real entry point once, on first call, and forwards all
//! arguments to it. Resolution goes through `hook::ResolveSymbol`, which uses
//! an injected `hook::SymbolResolver` when one is installed and otherwise
//! opens the configured library with `dlopen`.

use std::fmt::Write;

use super::{EmitContext, TrampolineBackend};
use crate::core::signature::Signature;

/// System headers the boilerplate depends on.
const SYSTEM_INCLUDES: &[&str] = &["atomic", "dlfcn.h", "mutex", "stdexcept", "string"];

/// Emits C++17 trampolines.
#[derive(Debug, Clone, Copy, Default)]
pub struct CppBackend;

impl CppBackend {
    pub fn new() -> Self {
        CppBackend
    }
}

impl TrampolineBackend for CppBackend {
    fn name(&self) -> &'static str {
        "c++"
    }

    fn prelude(&self, ctx: &EmitContext) -> String {
        let mut out = String::new();

        out.push_str("// Generated by hookgen. Do not edit.\n");
        let _ = writeln!(out, "// library: {}", ctx.library.display());
        if !ctx.triple.is_empty() {
            let _ = writeln!(out, "// target: {}", ctx.triple);
        }
        for header in &ctx.headers {
            let _ = writeln!(out, "// header: {}", header.display());
        }
        out.push('\n');

        for include in SYSTEM_INCLUDES {
            let _ = writeln!(out, "#include <{}>", include);
        }
        out.push('\n');
        for include in &ctx.includes {
            let _ = writeln!(out, "{}", include_line(include));
        }
        if !ctx.includes.is_empty() {
            out.push('\n');
        }

        out.push_str("#define HOOK_C_API extern \"C\"\n");
        out.push_str("#define HOOK_DECL_EXPORT __attribute__((visibility(\"default\")))\n\n");

        if !ctx.undefs.is_empty() {
            for name in &ctx.undefs {
                let _ = writeln!(out, "#undef {}", name);
            }
            out.push('\n');
        }

        out.push_str(&runtime_support(&ctx.library.display().to_string()));
        out.push('\n');
        out
    }

    fn trampoline(&self, exported: &str, signature: &Signature) -> String {
        let params = signature
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| p.declaration(i))
            .collect::<Vec<_>>()
            .join(", ");
        let types = signature
            .params
            .iter()
            .map(|p| p.ty.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let args = signature
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| p.binding(i))
            .collect::<Vec<_>>()
            .join(", ");
        let ret = &signature.return_type;

        let mut out = String::new();
        let _ = writeln!(
            out,
            "HOOK_C_API HOOK_DECL_EXPORT {} {}({}) {{",
            ret, exported, params
        );
        let _ = writeln!(out, "  using func_ptr = {} (*)({});", ret, types);
        out.push_str("  static std::once_flag once;\n");
        out.push_str("  static func_ptr func_entry = nullptr;\n");
        let _ = writeln!(
            out,
            "  std::call_once(once, [] {{ func_entry = reinterpret_cast<func_ptr>(hook::ResolveSymbol(\"{}\")); }});",
            exported
        );
        if signature.returns_void() {
            let _ = writeln!(out, "  func_entry({});", args);
        } else {
            let _ = writeln!(out, "  return func_entry({});", args);
        }
        out.push_str("}\n");
        out
    }
}

/// `<cuda.h>` and `"local.h"` are kept as written; bare names get angle brackets.
fn include_line(include: &str) -> String {
    if include.starts_with('<') || include.starts_with('"') {
        format!("#include {}", include)
    } else {
        format!("#include <{}>", include)
    }
}

fn c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn runtime_support(library: &str) -> String {
    format!(
        r#"namespace hook {{

constexpr const char* kLibraryPath = {library};

class SymbolResolver {{
 public:
  virtual ~SymbolResolver() = default;
  virtual void* Resolve(const char* name) = 0;
}};

class DynamicLibraryResolver final : public SymbolResolver {{
 public:
  explicit DynamicLibraryResolver(const char* path) : path_(path) {{
    handle_ = dlopen(path, RTLD_NOW | RTLD_LOCAL);
    if (handle_ == nullptr) {{
      throw std::runtime_error(std::string("unable to open ") + path_ + ": " + dlerror());
    }}
  }}

  void* Resolve(const char* name) override {{
    void* symbol = dlsym(handle_, name);
    if (symbol == nullptr) {{
      throw std::invalid_argument(std::string(path_) + ": unable to resolve " + name);
    }}
    return symbol;
  }}

 private:
  const char* path_;
  void* handle_ = nullptr;
}};

inline std::atomic<SymbolResolver*>& InstalledResolver() {{
  static std::atomic<SymbolResolver*> resolver{{nullptr}};
  return resolver;
}}

// Must be called before the first trampoline runs; entry points already
// resolved keep their address.
__attribute__((visibility("default"))) inline void SetSymbolResolver(SymbolResolver* resolver) {{
  InstalledResolver().store(resolver, std::memory_order_release);
}}

inline void* ResolveSymbol(const char* name) {{
  if (SymbolResolver* resolver = InstalledResolver().load(std::memory_order_acquire)) {{
    return resolver->Resolve(name);
  }}
  // Never destroyed: trampolines may run during static destruction.
  static SymbolResolver* fallback = new DynamicLibraryResolver(kLibraryPath);
  return fallback->Resolve(name);
}}

}}  // namespace hook
"#,
        library = c_string(library)
    )
}

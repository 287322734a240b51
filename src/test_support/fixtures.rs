//! Test fixtures for common test scenarios.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A trimmed-down `cuda.h` exercising the versioning conventions.
pub const CUDA_HEADER: &str = r#"
#ifndef __cuda_cuda_h__
#define __cuda_cuda_h__

#include <stddef.h>

#define CUDAAPI

#if defined(CUDA_API_PER_THREAD_DEFAULT_STREAM)
    #define __CUDA_API_PTDS(api) api ## _ptds
    #define __CUDA_API_PTSZ(api) api ## _ptsz
#else
    #define __CUDA_API_PTDS(api) api
    #define __CUDA_API_PTSZ(api) api
#endif

#define cuCtxCreate cuCtxCreate_v2
#define cuMemAlloc cuMemAlloc_v2
#define cuMemcpyHtoDAsync __CUDA_API_PTSZ(cuMemcpyHtoDAsync_v2)
#define cuGraphInstantiate cuGraphInstantiateWithFlags

typedef int CUresult;
typedef int CUdevice;
typedef unsigned long long CUdeviceptr;
typedef struct CUctx_st *CUcontext;
typedef struct CUstream_st *CUstream;
typedef struct CUgraph_st *CUgraph;
typedef struct CUgraphExec_st *CUgraphExec;
typedef struct CUgraphNode_st *CUgraphNode;
typedef void (CUDA_CB *CUhostFn)(void *userData);

#ifdef __cplusplus
extern "C" {
#endif

CUresult CUDAAPI cuInit(unsigned int Flags);
CUresult CUDAAPI cuCtxCreate(CUcontext *pctx, unsigned int flags, CUdevice dev);
CUresult CUDAAPI cuMemAlloc(CUdeviceptr *dptr, size_t bytesize);
CUresult CUDAAPI cuMemcpyHtoDAsync(CUdeviceptr dstDevice, const void *srcHost, size_t ByteCount, CUstream hStream);
CUresult CUDAAPI cuMemAllocAsync_ptsz(CUdeviceptr *dptr, size_t bytesize, CUstream hStream);
CUresult CUDAAPI cuLaunchHostFunc(CUstream hStream, CUhostFn fn, void *userData);
CUresult CUDAAPI cuGraphInstantiate(CUgraphExec *phGraphExec, CUgraph hGraph, unsigned long long flags);
void CUDAAPI cuProfilerStop(void);

#if defined(__CUDA_API_VERSION_INTERNAL)
    #undef cuCtxCreate
    #undef cuGraphInstantiate
    CUresult CUDAAPI cuCtxCreate(CUcontext *pctx, unsigned int flags, CUdevice dev);
    CUresult CUDAAPI cuGraphInstantiate(CUgraphExec *phGraphExec, CUgraph hGraph, CUgraphNode *phErrorNode, char *logBuffer, size_t bufferSize);
#endif

#ifdef __cplusplus
}
#endif

#endif
"#;

/// A project directory with headers, a symbol list and `hookgen.toml`.
#[derive(Debug)]
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    /// Create a project whose config reads symbols from `symbols.txt`.
    pub fn new(headers: &[(&str, &str)], symbols: &[&str]) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");

        let header_names: Vec<String> = headers.iter().map(|(n, _)| format!("\"{}\"", n)).collect();
        for (name, content) in headers {
            std::fs::write(dir.path().join(name), content).expect("failed to write header");
        }

        let mut list = symbols.join("\n");
        list.push('\n');
        std::fs::write(dir.path().join("symbols.txt"), list).expect("failed to write symbols");

        let config = format!(
            r#"[target]
library = "libcuda.so"
headers = [{}]

[symbols]
reader = "list"
list_file = "symbols.txt"

[output]
path = "hook.gen.cc"
includes = ["cuda.h"]
"#,
            header_names.join(", ")
        );
        std::fs::write(dir.path().join("hookgen.toml"), config).expect("failed to write config");

        ProjectFixture { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("hookgen.toml")
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join("hook.gen.cc")
    }
}

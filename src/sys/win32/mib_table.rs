#![allow(non_snake_case)]
use crate::Error;
use lazy_static::lazy_static;
use log::debug;
use std::ffi::c_void;
use std::io;
use std::marker::PhantomData;
use std::mem;
use windows::core::{HSTRING, PCSTR};
use windows::Win32::Foundation::ERROR_SUCCESS;
use windows::Win32::NetworkManagement::IpHelper::{MIB_IPFORWARD_ROW2, MIB_IPFORWARD_TABLE2};
use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};

type GetIpForwardTable2Fn =
    unsafe extern "system" fn(family: u16, table: *mut *mut MIB_IPFORWARD_TABLE2) -> u32;
type FreeMibTableFn = unsafe extern "system" fn(memory: *const c_void);

/// Entry points that only exist on Vista and later, looked up at run time.
struct IpHelperApi {
    get_ip_forward_table2: GetIpForwardTable2Fn,
    free_mib_table: FreeMibTableFn,
}

impl IpHelperApi {
    fn resolve() -> Option<Self> {
        let module = unsafe { GetModuleHandleW(&HSTRING::from("iphlpapi.dll")) }.ok()?;
        let get = unsafe { GetProcAddress(module, PCSTR(b"GetIpForwardTable2\0".as_ptr())) }?;
        let free = unsafe { GetProcAddress(module, PCSTR(b"FreeMibTable\0".as_ptr())) }?;

        Some(Self {
            get_ip_forward_table2: unsafe { mem::transmute(get) },
            free_mib_table: unsafe { mem::transmute(free) },
        })
    }
}

lazy_static! {
    static ref IP_HELPER_API: Option<IpHelperApi> = {
        let api = IpHelperApi::resolve();
        if api.is_none() {
            debug!("GetIpForwardTable2 is unavailable");
        }
        api
    };
}

/// A table allocated by the IP helper API, released with `FreeMibTable`.
pub(crate) struct MibTable<'a, T, R> {
    table: *mut T,
    free: FreeMibTableFn,
    phantom: PhantomData<&'a R>,
}

impl<'a> MibTable<'a, MIB_IPFORWARD_TABLE2, MIB_IPFORWARD_ROW2> {
    /// The IPv4 and IPv6 forwarding table, or `None` where the API does not exist.
    pub(crate) fn GetIpForwardTable2(family: u16) -> Option<Result<Self, Error>> {
        let api = IP_HELPER_API.as_ref()?;

        let mut table = std::ptr::null_mut();
        let code = unsafe { (api.get_ip_forward_table2)(family, &mut table) };
        if code != ERROR_SUCCESS.0 {
            return Some(Err(Error::RouteQuery(io::Error::from_raw_os_error(
                code as i32,
            ))));
        }

        Some(Ok(Self {
            table,
            free: api.free_mib_table,
            phantom: PhantomData,
        }))
    }

    pub(crate) fn as_slice(&self) -> &'a [MIB_IPFORWARD_ROW2] {
        match unsafe { self.table.as_ref() } {
            Some(table) => unsafe {
                std::slice::from_raw_parts(table.Table.as_ptr(), table.NumEntries as _)
            },
            None => &[],
        }
    }
}

impl<'a, T, R> Drop for MibTable<'a, T, R> {
    fn drop(&mut self) {
        if !self.table.is_null() {
            unsafe {
                (self.free)(self.table as _);
            }
        }
    }
}
